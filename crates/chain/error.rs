/// Errors the chain engine surfaces to its owner. Validation failures
/// (bad header, root mismatch, bloom mismatch) are absorbed inside the
/// engine per the error handling design and never reach this type — only
/// failures the caller must act on do.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("no peer attached to submit provisions against")]
    NoPeer,
    #[error(transparent)]
    Provision(#[from] photon_net::ProvisionError),
}
