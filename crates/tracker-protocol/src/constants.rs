//! Protocol constants
//!
//! Opcodes, device status codes and size limits used on the tracker's
//! UART-over-BLE service. Values are fixed by the tracker firmware.

// ============================================================================
// Opcodes (host → firmware, echoed back in responses)
// ============================================================================

/// List the entries of a directory.
pub const CMD_LIST_DIR: u8 = 0x01;
/// Open a file for reading; returns a handle and the file size.
pub const CMD_OPEN_FILE: u8 = 0x02;
/// Read a chunk of an open file.
pub const CMD_READ_CHUNK: u8 = 0x03;
/// Release an open file handle.
pub const CMD_CLOSE_FILE: u8 = 0x04;
/// Delete a file.
pub const CMD_DELETE_FILE: u8 = 0x05;
/// Read the system telemetry block.
pub const CMD_GET_SYS_INFO: u8 = 0x06;
/// Begin an AGNSS upload of a declared length.
pub const CMD_START_AGNSS_WRITE: u8 = 0x07;
/// Write one AGNSS chunk at an offset.
pub const CMD_WRITE_AGNSS_CHUNK: u8 = 0x08;
/// Finish (commit or abort) an AGNSS upload.
pub const CMD_END_AGNSS_WRITE: u8 = 0x09;
/// Wake the GPS receiver immediately.
pub const CMD_GPS_WAKEUP: u8 = 0x0A;
/// Keep the GPS receiver powered for a number of minutes.
pub const CMD_GPS_KEEP_ALIVE: u8 = 0x0B;
/// Store Find My advertisement keys and start advertising.
pub const CMD_WRITE_FINDMY_KEYS: u8 = 0x0C;
/// Read back the stored Find My keys.
pub const CMD_READ_FINDMY_KEYS: u8 = 0x0D;
/// Whether Find My advertising is enabled.
pub const CMD_GET_FINDMY_STATUS: u8 = 0x0E;

// ============================================================================
// Device status codes (second byte of every response)
// ============================================================================

/// Request succeeded.
pub const STATUS_OK: u8 = 0x00;
/// Path or handle does not exist.
pub const STATUS_NOT_FOUND: u8 = 0x01;
/// Device cannot serve the request right now.
pub const STATUS_DEVICE_BUSY: u8 = 0x02;
/// AGNSS byte count did not match the declared length.
pub const STATUS_LENGTH_MISMATCH: u8 = 0x03;
/// Read reached the end of the file.
pub const STATUS_END_OF_FILE: u8 = 0x04;

// ============================================================================
// Directory entry kinds
// ============================================================================

/// Regular file entry.
pub const ENTRY_KIND_FILE: u8 = 0x00;
/// Directory entry.
pub const ENTRY_KIND_DIRECTORY: u8 = 0x01;

// ============================================================================
// END_AGNSS_WRITE outcome flag
// ============================================================================

/// Commit the uploaded AGNSS data.
pub const AGNSS_END_COMMIT: u8 = 0x00;
/// Discard a partially uploaded AGNSS buffer.
pub const AGNSS_END_ABORT: u8 = 0x01;

// ============================================================================
// Sizes and limits
// ============================================================================

/// Request header: opcode + 2-byte payload length.
pub const REQUEST_HEADER_SIZE: usize = 3;
/// Response header: opcode + status + 2-byte payload length.
pub const RESPONSE_HEADER_SIZE: usize = 4;
/// Largest request payload the firmware's command parser accepts.
pub const MAX_REQUEST_PAYLOAD: usize = 570;
/// Largest response payload the firmware emits.
pub const MAX_RESPONSE_PAYLOAD: usize = 1024;
/// Paths carry a one-byte length prefix.
pub const MAX_PATH_LEN: usize = u8::MAX as usize;
/// Largest data block a single READ_CHUNK returns.
pub const MAX_READ_CHUNK: usize = 254;
/// Largest single AGNSS chunk the firmware stores.
pub const MAX_AGNSS_CHUNK: usize = 568;
/// Chunk budget assumed before the transport negotiates a larger MTU.
pub const DEFAULT_CHUNK_SIZE: usize = 23;
/// Bytes of ATT header overhead in every BLE write/notification.
pub const ATT_HEADER_SIZE: usize = 3;

/// Legacy GET_SYS_INFO payload length.
pub const SYS_INFO_LEGACY_LEN: usize = 50;
/// Extended (versioned) GET_SYS_INFO payload length.
pub const SYS_INFO_EXTENDED_LEN: usize = 63;
/// Version byte leading an extended GET_SYS_INFO payload.
pub const SYS_INFO_EXTENDED_VERSION: u8 = 2;

/// Find My key blob: public key, private key, epoch (u64 LE).
pub const FINDMY_KEY_SIZE: usize = 68;
/// Advertised public key length.
pub const FINDMY_PUBLIC_KEY_LEN: usize = 28;
/// Private key length.
pub const FINDMY_PRIVATE_KEY_LEN: usize = 32;
