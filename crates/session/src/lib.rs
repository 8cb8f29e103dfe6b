// folio-session library entry point: the open-document session, safe
// renames, and startup restoration under a workspace access grant.

pub mod config;
pub mod document;
pub mod error;
pub mod fs;
pub mod grant;
pub mod paths;
pub mod prefs;
pub mod rename;
pub mod restore;
pub mod security;
pub mod store;
