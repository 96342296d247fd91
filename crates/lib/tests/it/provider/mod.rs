//! Provider contract tests.
//!
//! The same sequence of operations is run against every backend, against
//! proxies, and through both transports, so that all of them agree on the
//! observable behaviour and on the error kind of each failure.

mod contract;
