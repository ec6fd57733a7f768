//! The kernel-wide ttp instance.
//!
//! Instrumented code does not carry a tracer reference around; it calls
//! [`ttp_emit`] (or the [`ttp!`](crate::ttp) macro), which is a no-op until
//! [`init`] has installed the instance.
//!
//! ```rust,ignore
//! ttp::global::init(TtpConfig::detect(), Box::new(SystemClock::new()), Box::new(ThreadUnit))?;
//!
//! // in a hot path
//! ttp::ttp!(IRQ_ENTRY_ID);
//! ```

use alloc::boxed::Box;

use conquer_once::spin::OnceCell;

use crate::clock::ClockSource;
use crate::config::TtpConfig;
use crate::cpu::ProcessingUnit;
use crate::device::TtpFile;
use crate::error::TtpError;
use crate::tracer::Tracer;

/// Tracer type held by the kernel-wide instance.
pub type GlobalTracer = Tracer<Box<dyn ClockSource>, Box<dyn ProcessingUnit>>;

static TTP: OnceCell<GlobalTracer> = OnceCell::uninit();

/// Build and install the kernel-wide tracer.
///
/// Fails with `AlreadyInitialized` on a second call; the freshly built
/// tracer is released in that case.
pub fn init(
    config: TtpConfig,
    clock: Box<dyn ClockSource>,
    units: Box<dyn ProcessingUnit>,
) -> Result<&'static GlobalTracer, TtpError> {
    if TTP.is_initialized() {
        return Err(TtpError::AlreadyInitialized);
    }

    let tracer = Tracer::new(config, clock, units)?;
    TTP.try_init_once(move || tracer)
        .map_err(|_| TtpError::AlreadyInitialized)?;

    get().ok_or(TtpError::NotInitialized)
}

/// The installed tracer, if any.
#[inline]
pub fn get() -> Option<&'static GlobalTracer> {
    TTP.get()
}

/// Emit a trace point through the kernel-wide tracer.
#[inline]
pub fn ttp_emit(id: u32) {
    if let Some(tracer) = TTP.get() {
        tracer.emit(id);
    }
}

/// Open the kernel-wide device. `NotInitialized` before [`init`].
pub fn open() -> Result<TtpFile<'static, Box<dyn ClockSource>, Box<dyn ProcessingUnit>>, TtpError> {
    get().map(Tracer::open).ok_or(TtpError::NotInitialized)
}

/// Record a timed trace point through the kernel-wide tracer.
///
/// ```rust,ignore
/// ttp!(42);
/// ```
#[macro_export]
macro_rules! ttp {
    ($id:expr) => {
        $crate::global::ttp_emit($id as u32)
    };
}
