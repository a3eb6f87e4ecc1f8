//! Unit and behavioural tests for phpast-syntax.

mod unit;
