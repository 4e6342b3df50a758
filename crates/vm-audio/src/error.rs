use thiserror::Error;

/// Errors originating from the audio module.
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio input device found.
    #[error("Aucun périphérique audio d'entrée trouvé")]
    NoInputDevice,

    /// A named input device does not exist.
    #[error("Périphérique d'entrée introuvable : {0}")]
    DeviceNotFound(String),

    /// Unsupported audio format.
    #[error("Format audio non supporté : {0}")]
    UnsupportedFormat(String),

    /// Audio stream error.
    #[error("Erreur de stream audio : {0}")]
    StreamError(String),

    /// Audio decode error.
    #[error("Erreur de décodage : {0}")]
    DecodeError(String),

    /// No constructor registered under this name.
    #[error("Processeur inconnu : {0}")]
    UnknownProcessor(String),

    /// A constructor is already registered under this name.
    #[error("Processeur déjà enregistré : {0}")]
    DuplicateProcessor(&'static str),
}
