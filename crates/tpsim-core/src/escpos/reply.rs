//! Printer-to-host acknowledgement encoding.
//!
//! Wire format of the process-identifier response:
//! ```text
//! [header:2 = 37 25][fn:1 = 30][status:1 = 00][d1][d2][d3][d4][NUL:1 = 00]
//! ```

/// Length in bytes of the process-identifier response.
pub const PROCESS_ID_RESPONSE_LEN: usize = 9;

const RESPONSE_HEADER: [u8; 2] = [0x37, 0x25];
const FN_PROCESS_ID: u8 = 0x30;
const STATUS_OK: u8 = 0x00;
const NUL: u8 = 0x00;

/// Builds the 9-byte response to a process-identifier request, echoing the
/// four data bytes the host sent.
///
/// # Examples
///
/// ```rust
/// use tpsim_core::process_id_response;
///
/// let reply = process_id_response([1, 2, 3, 4]);
/// assert_eq!(reply, [0x37, 0x25, 0x30, 0x00, 1, 2, 3, 4, 0x00]);
/// ```
pub fn process_id_response(data: [u8; 4]) -> [u8; PROCESS_ID_RESPONSE_LEN] {
    let [d1, d2, d3, d4] = data;
    [
        RESPONSE_HEADER[0],
        RESPONSE_HEADER[1],
        FN_PROCESS_ID,
        STATUS_OK,
        d1,
        d2,
        d3,
        d4,
        NUL,
    ]
}
