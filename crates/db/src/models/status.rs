//! Status helper enums mapping to SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding lookup table.

use payroll_core::error::CoreError;
use payroll_core::operation::{ItemStatus, OperationStatus, OperationType};

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident => $domain:ident {
            $( $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            pub fn from_id(id: StatusId) -> Result<Self, CoreError> {
                match id {
                    $( $val => Ok(Self::$variant), )+
                    other => Err(CoreError::Internal(format!(
                        concat!("Unknown ", stringify!($name), " id {}"),
                        other
                    ))),
                }
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }

        impl From<$domain> for $name {
            fn from(value: $domain) -> Self {
                match value {
                    $( $domain::$variant => Self::$variant, )+
                }
            }
        }

        impl From<$name> for $domain {
            fn from(value: $name) -> Self {
                match value {
                    $( $name::$variant => Self::$variant, )+
                }
            }
        }
    };
}

define_status_enum! {
    /// Kind of bulk operation (`bulk_operation_types`).
    OperationTypeId => OperationType {
        SalaryAdjustment = 1,
        Rollback = 2,
    }
}

define_status_enum! {
    /// Operation lifecycle status (`bulk_operation_statuses`).
    OperationStatusId => OperationStatus {
        Created = 1,
        Executing = 2,
        Completed = 3,
        PartiallyCompleted = 4,
        Failed = 5,
    }
}

define_status_enum! {
    /// Item status (`bulk_operation_item_statuses`).
    ItemStatusId => ItemStatus {
        Pending = 1,
        Applied = 2,
        Failed = 3,
        Rolledback = 4,
    }
}

/// Decode a stored operation status.
pub fn operation_status(id: StatusId) -> Result<OperationStatus, CoreError> {
    OperationStatusId::from_id(id).map(Into::into)
}

/// Decode a stored item status.
pub fn item_status(id: StatusId) -> Result<ItemStatus, CoreError> {
    ItemStatusId::from_id(id).map(Into::into)
}

/// Decode a stored operation type.
pub fn operation_type(id: StatusId) -> Result<OperationType, CoreError> {
    OperationTypeId::from_id(id).map(Into::into)
}
