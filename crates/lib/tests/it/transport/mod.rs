//! Transport tests: server lifecycle, connection handling and wire mapping.

mod http;
mod native;
