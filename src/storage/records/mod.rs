pub(crate) mod conversation;
pub(crate) mod message;
