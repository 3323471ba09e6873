//! Server-rendered HTML.
//!
//! Every interaction is a plain form post that re-renders the page, so the
//! dashboard works without client-side state.
//!
//! - [`html`]: escaping, page shell and shared fragments
//! - [`form`]: tool input widgets as form controls
//! - [`results`]: run output and history
//! - [`pages`]: the dashboard, servers, settings, share and about screens

pub mod form;
pub mod html;
pub mod pages;
pub mod results;
