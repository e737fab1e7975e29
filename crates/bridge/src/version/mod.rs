mod descriptor;
mod gate;

pub use descriptor::{compare, Accuracy, PackageTag, ParseError, VersionDescriptor};
pub use gate::{gate, GateResult, VersionGate, VersionRange};
