pub mod attributes;
pub mod constants;
pub mod entity;
pub mod gesture;
pub mod match_loop;
pub mod match_result;
pub mod state;
pub mod status;
pub mod systems;
