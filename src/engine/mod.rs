//! Engine sub-modules: timeslot model, slot series and its row cache, slot
//! collection from the live book, layout and colour/size scaling.

pub mod collector;
pub mod gradient;
pub mod layout;
pub mod scale;
pub mod series;
pub mod timeslot;
