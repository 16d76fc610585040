// Author: Dustin Pilgrim
// License: MIT

pub mod gcode;
pub mod reactor;
pub mod toolhead;
