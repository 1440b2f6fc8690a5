use thiserror::Error;

/// Errors that can occur during NVM operations. The list is likely to stay as is but marked as
/// non-exhaustive to allow for future additions without breaking the API. A caller would usually
/// only branch on `Locked` (retry later) and `ChecksumMismatch` (refuse to trust the image).
#[derive(Error, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The software/firmware sync bits stayed contended past the retry budget, a mutating
    /// operation was called without the required agents held, or an already-held mask was
    /// acquired again.
    #[error("nvm ownership not held or contended")]
    Locked,

    /// The device never signalled completion of a word command or flash update within the
    /// poll budget.
    #[error("device busy-bit timeout")]
    Timeout,

    /// `offset + count` goes past the end of the word store, or the request is empty.
    #[error("word offset out of range")]
    OutOfRange,

    /// No populated flash behind the shadow RAM. Flashless parts carry their configuration
    /// in the iNVM plane instead; see [`Nvm::read_invm_word`](crate::Nvm::read_invm_word).
    #[error("flash not present")]
    NotReady,

    /// The word sum over the checksummed range does not add up to the required constant.
    /// Configuration derived from the word store must not be trusted after this.
    #[error("nvm checksum invalid")]
    ChecksumMismatch,

    /// No matching record appeared before the iNVM scan terminated.
    #[error("invm record not found")]
    VersionNotFound,
}
