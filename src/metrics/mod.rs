//! In-process metric storage.
//!
//! A [`MetricsStore`] lays out a fixed set of named metrics in one buffer:
//! a self-describing metadata block followed by a packed value block. Typed
//! [`Metric`] handles write straight into their slot; the buffer can be
//! copied out byte for byte and read elsewhere through a [`crate::view::View`].

pub mod codec;
pub mod descriptor;
pub mod handle;
pub mod hash;
pub mod kind;
pub mod layout;
pub mod store;

pub use codec::{Bool, Endianness, Enum8, Kind, Numeric, SlotState, F32, F64, I32, I64, U32, U64};
pub use descriptor::{EnumValue, MetricDescriptor};
pub use handle::Metric;
pub use kind::{Role, Value, ValueKind, WidthClass};
pub use layout::{Metadata, MetricInfo, PROTOCOL_VERSION};
pub use store::MetricsStore;
