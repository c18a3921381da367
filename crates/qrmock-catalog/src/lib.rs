//! Device catalog for the qrmock runtime server.
//!
//! The catalog is a fixed, compiled-in set of fake quantum devices. Every
//! document it produces (configuration, calibration properties, status) is
//! derived deterministically from the device descriptor, so two processes
//! serving the same device name always return the same data.
//!
//! # Overview
//!
//! - [`Device`] describes one addressable compute target.
//! - [`CouplingMap`] captures qubit connectivity.
//! - [`DeviceCatalog`] resolves device names and renders the REST documents
//!   ([`DeviceConfiguration`], [`DeviceProperties`], [`DeviceStatus`],
//!   [`DeviceSummary`]).
//!
//! # Built-in devices
//!
//! | Device | Qubits | Processor |
//! |--------|--------|-----------|
//! | `fake_manila` | 5 | Falcon r5.11L |
//! | `fake_lima` | 5 | Falcon r4T |
//! | `fake_belem` | 5 | Falcon r4T |
//! | `fake_quito` | 5 | Falcon r4T |
//! | `fake_jakarta` | 7 | Falcon r5.11H |
//! | `fake_nairobi` | 7 | Falcon r5.11H |
//! | `fake_guadalupe` | 16 | Falcon r4P |
//! | `fake_kolkata` | 27 | Falcon r5.11 |
//! | `aer_simulator` | 32 | ideal simulator |
//!
//! # Example
//!
//! ```
//! use qrmock_catalog::DeviceCatalog;
//!
//! let catalog = DeviceCatalog::builtin();
//! let device = catalog.resolve("fake_manila").unwrap();
//! assert_eq!(device.num_qubits, 5);
//! assert!(catalog.resolve("ghost").is_none());
//! ```

pub mod catalog;
pub mod device;
pub mod documents;
pub mod topology;

pub use catalog::DeviceCatalog;
pub use device::{Device, NoiseProfile, ProcessorType};
pub use documents::{
    DeviceConfiguration, DeviceDefaults, DeviceProperties, DeviceStatus, DeviceSummary,
    GateConfig, GateProperties, Nduv,
};
pub use topology::CouplingMap;
