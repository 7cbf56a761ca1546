//! Relation model and principal types.

mod principal;
mod types;
mod types_proptest;

pub use principal::{ClaimSet, Principal};
pub use types::{
    relations_allow, Action, Assignment, Credential, EntityRef, Guard, Relation,
    DOCUMENT_ENTITY_TYPE, USER_ENTITY_TYPE,
};
