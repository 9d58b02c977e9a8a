//! Loading packet definitions from generated C headers.
//!
//! Generated headers follow a fixed shape: a `typedef struct` whose last
//! member is the identity tag, followed by the identity constants:
//!
//! ```c
//! typedef struct {
//!     uint32 sequenceNo;
//!     uint32 sampleTime;
//!     float32 C2E_UPZE1;
//!     uint32 test3_416000005;
//! } test3;
//!
//! #define RT_test3_PVC 416
//! #define RT_test3_ID 416000005
//! #define RT_test3_VERSION 5
//! #define TEST3_test3_METADATA 7
//! ```
//!
//! [`TypeDb`] collects constants and structs from any number of headers and
//! turns each struct with an `ID` constant into a [`PacketLayout`](crate::types::PacketLayout).

mod expr;
mod parser;
mod type_db;

pub use expr::evaluate;
pub use parser::{Constant, DEFAULT_VERSION, FieldDef, HeaderFile, HeaderParser, StructDef, parse_header};
pub use type_db::TypeDb;
