//! Hardware socket allocation.

use crate::socket::{SocketHandle, SocketRegisters};

/// Find the lowest-index socket whose status allows reuse.
///
/// Only status registers are read; the caller opens and configures the
/// returned slot. `None` means every slot is busy.
pub fn acquire_free_socket<R: SocketRegisters + ?Sized>(regs: &mut R) -> Option<SocketHandle> {
    (0..regs.socket_count())
        .map(SocketHandle)
        .find(|&socket| regs.socket_status(socket).is_reclaimable())
}
