//! Simulation: water, entities, physics and the authoritative host

pub mod archetype;
pub mod cargo;
pub mod combat;
pub mod entity;
pub mod host;
pub mod npc;
pub mod physics;
pub mod snapshot;
pub mod spring;
pub mod water;
pub mod wave;
pub mod world;

pub use archetype::EntityKind;
pub use host::{HostConfig, HostError, HostEvent, HostHandle, HostRegistry, SimulationHost};
pub use water::WaterChunk;
pub use wave::{WaveField, WaveParams};
pub use world::{Bounds, World, WorldConfig};
