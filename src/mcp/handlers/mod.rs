pub(crate) mod chat;
pub(crate) mod list_kbs;
pub(crate) mod search;
