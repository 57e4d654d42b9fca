use thiserror::Error;

/// Result alias for everything inside the decoder core.
pub type DecodeResult<T> = std::result::Result<T, DecodeError>;

/// Error taxonomy for the decoder.
///
/// The first three variants are record-scoped (one raw message or
/// conversation record is bad), `Structural` is conversation-scoped, and
/// `Collision` poisons a whole batch. Callers decide whether a
/// record-scoped failure skips the record or aborts the run; the core
/// never aborts a batch on its own except for `Collision`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// A raw record's shape matches no known pre-validation fixup.
    #[error("normalization failed at {path}: {detail}")]
    Normalization { path: String, detail: String },

    /// A discriminator tag names no registered variant.
    #[error("unknown {family} tag `{tag}` at {path} (accepted: {accepted})")]
    UnknownVariant {
        path: String,
        family: &'static str,
        tag: String,
        accepted: String,
    },

    /// A required attribute is missing, an undeclared attribute is
    /// present, or a value violates its declared type or enumeration.
    #[error("schema mismatch at {path}: {detail}")]
    SchemaMismatch { path: String, detail: String },

    /// A tree invariant does not hold for one conversation.
    #[error("structural violation in conversation `{conversation_id}`: {detail}")]
    Structural {
        conversation_id: String,
        detail: String,
    },

    /// Two distinct identifiers shortened to the same suffix.
    #[error(
        "identifier shortening collision: `{original_a}` and `{original_b}` both shorten to \
         `{suffix}` ({originals} identifiers seen, {shortened} distinct suffixes)"
    )]
    Collision {
        original_a: String,
        original_b: String,
        suffix: String,
        originals: usize,
        shortened: usize,
    },
}

impl DecodeError {
    pub fn normalization(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Normalization {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn unknown_variant(
        path: impl Into<String>,
        family: &'static str,
        tag: impl Into<String>,
        accepted: &[&str],
    ) -> Self {
        Self::UnknownVariant {
            path: path.into(),
            family,
            tag: tag.into(),
            accepted: accepted.join(", "),
        }
    }

    pub fn schema(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub fn structural(conversation_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Structural {
            conversation_id: conversation_id.into(),
            detail: detail.into(),
        }
    }

    /// True for errors that poison the whole batch rather than one record.
    #[must_use]
    pub const fn is_batch_fatal(&self) -> bool {
        matches!(self, Self::Collision { .. })
    }
}
