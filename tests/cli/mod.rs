//! End-to-end tests of the sql-runner binary.
