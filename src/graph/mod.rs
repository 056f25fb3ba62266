//! Microsoft Graph drive access.
//!
//! Folder enumeration, single-shot file upload, and the sequential batch
//! orchestration on top of them.

pub mod client;
pub mod transfer;

pub use client::{Folder, GraphClient, UploadResult, UserProfile};
pub use transfer::{upload_all, FileUploader, UploadReport};
