use std::path::PathBuf;

use crate::ClientId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Fetch the server's list of completed jobs.
    RefreshSnapshot,
    /// Upload the selected file for the optimistic row `client_id`.
    SubmitFile {
        client_id: ClientId,
        input_name: String,
        location: PathBuf,
    },
    /// Download and save a finished artifact.
    RetrieveArtifact {
        client_id: ClientId,
        output_name: String,
    },
}
