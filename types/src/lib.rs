pub mod config;
pub mod error;
pub mod nonstandard;
pub mod object_root;
pub mod preset;

pub mod phase0 {
    pub mod beacon_state;
    pub mod consts;
    pub mod containers;
    pub mod primitives;
}
