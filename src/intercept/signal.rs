//! Signal mask changes

use super::{intercepted_call, symbols};
use nix::sys::signal::{SigSet, SigmaskHow};

pub use nix::sys::signal::Signal;

/// Change the process signal mask
pub fn sigprocmask(
    how: SigmaskHow,
    set: Option<&SigSet>,
    oldset: Option<&mut SigSet>,
) -> nix::Result<()> {
    intercepted_call(symbols::SIGPROCMASK);
    nix::sys::signal::sigprocmask(how, set, oldset)
}

/// Change the calling thread's signal mask
pub fn pthread_sigmask(
    how: SigmaskHow,
    set: Option<&SigSet>,
    oldset: Option<&mut SigSet>,
) -> nix::Result<()> {
    intercepted_call(symbols::PTHREAD_SIGMASK);
    nix::sys::signal::pthread_sigmask(how, set, oldset)
}
