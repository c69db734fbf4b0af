pub mod card;
pub mod labels;
pub mod mailbox;
pub mod message_record;
