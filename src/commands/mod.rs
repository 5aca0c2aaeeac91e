/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `run`: consume image update events and serve the HTTP facade
- `restart`: one-off restart for a tag, printed as a table
- `check`: offline restart policy evaluation
*/

pub mod check;
pub mod restart;
pub mod run;
