//! Front ends for the document QA session: the interactive chat loop and
//! the HTTP server.
pub mod chat;
pub mod server;
