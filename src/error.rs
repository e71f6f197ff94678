//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AllocatorError {
    #[error("Invalid panel or face key: {0}")]
    InvalidKey(String),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unable to connect to server, please try again.")]
    Transport(#[from] reqwest::Error),

    /// The server answered but refused the request; the message is shown verbatim
    #[error("{0}")]
    Server(String),

    #[error("Unable to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Input is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}
