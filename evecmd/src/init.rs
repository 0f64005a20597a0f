use crate::config::{BootConfig, ClockFrequency, ClockSource};
use crate::error::{interface_result, Error};
use crate::models::Model;
use crate::registers::Register;
use crate::transport::Transport;
use crate::EVE;

/// The value `REG_ID` holds once the chip has booted.
pub const CHIP_ID: u8 = 0x7c;

pub(crate) fn activate_system_clock<M: Model, T: Transport>(
    eve: &mut EVE<M, T>,
    source: ClockSource,
    freq: ClockFrequency,
) -> Result<(), Error<T::Error>> {
    use crate::host_commands::HostCmd::*;

    let ll = &mut eve.ll;

    interface_result(ll.borrow_transport().reset())?;

    // Just in case the system was already activated before we were
    // called, we'll put it to sleep while we do our work here.
    interface_result(ll.host_command(PWRDOWN, 0))?;
    interface_result(ll.host_command(ACTIVE, 0))?;
    interface_result(ll.host_command(SLEEP, 0))?;

    // Internal or external clock source?
    let source_cmd = match source {
        ClockSource::Internal => CLKINT,
        ClockSource::External => CLKEXT,
    };
    interface_result(ll.host_command(source_cmd, 0))?;

    interface_result(ll.host_command(CLKSEL, freq.cmd_clksel_args()))?;

    // Activate the system clock.
    interface_result(ll.host_command(ACTIVE, 0))?;

    // Pulse the reset signal to the rest of the device.
    interface_result(ll.host_command(RST_PULSE, 0))?;

    tracing::debug!(?source, ?freq, "system clock started");
    Ok(())
}

// Waits for the IC to signal that it's ready, first by responding to the ID
// register and then by releasing all of its engines from reset. Each phase
// has its own poll budget, with a fixed delay between polls.
pub(crate) fn poll_for_boot<M: Model, T: Transport>(
    eve: &mut EVE<M, T>,
    config: &BootConfig,
) -> Result<(), Error<T::Error>> {
    let ll = &mut eve.ll;
    let id = M::register(Register::ID).ok_or(Error::Unsupported)?;
    let cpureset = M::register(Register::CPURESET).ok_or(Error::Unsupported)?;

    let mut poll = 0;
    loop {
        if interface_result(ll.rd8(id))? == CHIP_ID {
            break;
        }
        poll += 1;
        if poll >= config.chip_id_polls {
            tracing::warn!(polls = poll, "chip ID never appeared");
            return Err(Error::ChipIdTimeout);
        }
        ll.delay_ms(config.poll_delay_ms);
    }
    tracing::debug!(polls = poll, "chip ID read");

    let mut poll = 0;
    loop {
        if interface_result(ll.rd8(cpureset))? & 0b111 == 0 {
            break;
        }
        poll += 1;
        if poll >= config.reset_polls {
            tracing::warn!(polls = poll, "engines never left reset");
            return Err(Error::ResetTimeout);
        }
        ll.delay_ms(config.poll_delay_ms);
    }
    tracing::debug!(model = M::DEBUG_NAME, "boot complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::models::{BT81x, FT80x};
    use crate::transport::testing::{FakeDevice, Op};
    use std::vec;

    #[test]
    fn test_system_clock_sequence() {
        let dev = FakeDevice::new::<BT81x>();
        let mut eve: EVE<BT81x, _> = EVE::new(dev.clone());
        eve.start_system_clock(ClockSource::External, ClockFrequency::F72MHz)
            .unwrap();
        let host = |cmd: u8, param: u8| Op::HostCmd { cmd, param };
        assert_eq!(
            dev.ops(),
            vec![
                Op::Reset,
                host(0x43, 0),
                host(0x00, 0),
                host(0x42, 0),
                host(0x44, 0),
                host(0x61, 6),
                host(0x00, 0),
                host(0x68, 0),
            ]
        );
    }

    #[test]
    fn test_poll_for_boot() {
        let dev = FakeDevice::new::<FT80x>().with_boot_delay(3, 2);
        let mut eve: EVE<FT80x, _> = EVE::new(dev.clone());
        eve.poll_for_boot(&BootConfig::default()).unwrap();
        let delays = dev.ops().into_iter().filter(|op| *op == Op::Delay(1)).count();
        assert_eq!(delays, 5);
    }

    #[test]
    fn test_chip_id_timeout() {
        let dev = FakeDevice::new::<BT81x>().with_boot_delay(10, 0);
        let mut eve: EVE<BT81x, _> = EVE::new(dev.clone());
        let config = BootConfig {
            chip_id_polls: 4,
            ..BootConfig::default()
        };
        assert!(matches!(
            eve.poll_for_boot(&config),
            Err(Error::ChipIdTimeout)
        ));
        let reads = dev
            .ops()
            .into_iter()
            .filter(|op| matches!(op, Op::Read { .. }))
            .count();
        assert_eq!(reads, 4);
    }

    #[test]
    fn test_reset_timeout() {
        let dev = FakeDevice::new::<BT81x>().with_boot_delay(0, 100);
        let mut eve: EVE<BT81x, _> = EVE::new(dev);
        assert!(matches!(
            eve.poll_for_boot(&BootConfig::default()),
            Err(Error::ResetTimeout)
        ));
    }
}
