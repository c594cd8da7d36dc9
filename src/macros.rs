//! Declarative helpers for protocol tables.

/// Declares the `CommandType` enum along with byte conversions.
macro_rules! define_command_type {
    ($($name:ident = $val:literal),* $(,)?) => {
        /// Tuya command byte.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum CommandType {
            $($name = $val),*
        }

        impl CommandType {
            pub fn from_u8(val: u8) -> Option<Self> {
                match val {
                    $($val => Some(CommandType::$name),)*
                    _ => None,
                }
            }

            pub fn as_u8(self) -> u8 {
                self as u8
            }
        }
    };
}

/// Declares error code constants and a lookup for their messages.
macro_rules! define_error_codes {
    ($($name:ident = $val:literal => $msg:expr),* $(,)?) => {
        $(pub const $name: u32 = $val;)*

        /// Human readable message for an error code.
        pub fn get_error_message(code: u32) -> &'static str {
            match code {
                $($val => $msg,)*
                _ => "Unknown Error",
            }
        }
    };
}
