use crate::Tag;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    #[error("failed to open mailbox device")]
    Open(#[source] io::Error),
    #[error("failed to close mailbox device")]
    Close(#[source] io::Error),
    #[error("mailbox transaction {tag} failed")]
    Transport {
        tag: Tag,
        #[source]
        source: io::Error,
    },
    #[error("mailbox rejected {tag} with status {status:#010x}")]
    Protocol { tag: Tag, status: u32 },
    #[error("{tag} request carries {words} words, at most {max} fit")]
    PayloadTooLarge { tag: Tag, words: usize, max: usize },
}
