pub mod check;
pub mod detect;
pub mod events;
pub mod run;
