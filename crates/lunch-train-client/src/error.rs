use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Input the user has to correct before anything is sent.
    #[error("{0}")]
    Validation(&'static str),

    /// The server no longer has this train.
    #[error("train {0} no longer exists")]
    NotFound(Uuid),

    /// The server answered with a failure status.
    #[error("server refused the request ({status}): {message}. Please try again")]
    Status { status: u16, message: String },

    #[error("could not reach the lunch train server: {0}. Please try again")]
    Transport(#[from] reqwest::Error),

    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("identity storage failed: {0}")]
    Identity(#[from] std::io::Error),

    #[error("identity file is not valid JSON: {0}")]
    IdentityFormat(#[from] serde_json::Error),

    /// A switch left the old train but could not join the new one.
    /// The user is currently on no train at all.
    #[error("left train {from} but joining {to} failed: {source}")]
    Stranded {
        from: Uuid,
        to: Uuid,
        #[source]
        source: Box<ClientError>,
    },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
