//! Binary primitives.
//!
//! This module provides the storage and arithmetic the machine is built on:
//! - [`BitVector`] - A fixed-width bit container (words, buses, RAM images)
//! - [`Reference`] - A typed `(address, width, name)` bit-field descriptor
//! - [`arith`] - Bit-serial addition and subtraction with carry/borrow out

mod vector;
mod reference;
pub mod arith;

pub use vector::BitVector;
pub use reference::Reference;
pub use arith::{plus, minus};
