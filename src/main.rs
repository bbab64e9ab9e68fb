#![no_std]
#![no_main]

use defmt::*;

use embassy_executor::Spawner;
use embassy_rp::adc::{self, Adc, Async, Channel, Config as AdcConfig};
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Level, Output, Pull};
use embassy_time::Delay;

use {defmt_rtt as _, panic_probe as _};

use thermo_hold::sensor::{SensorFault, TemperatureSensor, Thermistor};
use thermo_hold::telemetry::DefmtTelemetry;
use thermo_hold::{ControlConfig, ControlLoop, RelayHeater, Temperature, RAW_SAMPLE_WINDOW};

bind_interrupts!(struct Irqs {
    ADC_IRQ_FIFO => adc::InterruptHandler;
});

/// Thermistor divider sampled by the on-chip ADC
struct AdcThermistor<'d> {
    adc: Adc<'d, Async>,
    channel: Channel<'d>,
    thermistor: Thermistor,
}

impl TemperatureSensor for AdcThermistor<'_> {
    async fn read(&mut self) -> Result<Temperature, SensorFault> {
        let counts = match self.adc.read(&mut self.channel).await {
            Ok(counts) => counts,
            Err(e) => {
                error!("ADC read failed: {:?}", Debug2Format(&e));
                return Err(SensorFault::Bus);
            }
        };
        trace!("ADC counts: {}", counts);
        self.thermistor.celsius(counts)
    }
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    info!("Program start");
    let peripherals = embassy_rp::init(Default::default());

    // Thermistor divider on GPIO 26 (ADC0)
    let adc = Adc::new(peripherals.ADC, Irqs, AdcConfig::default());
    let channel = Channel::new_pin(peripherals.PIN_26, Pull::None);
    let sensor = AdcThermistor {
        adc,
        channel,
        thermistor: Thermistor::default(),
    };

    // Heater relay on GPIO 15, off until the first decision
    let relay = Output::new(peripherals.PIN_15, Level::Low);

    let config = ControlConfig::default();
    info!(
        "Holding {} degC, band +/-{} degC, period {} ms",
        config.target, config.hysteresis, config.sample_period_ms
    );

    let mut control: ControlLoop<_, _, _, _, RAW_SAMPLE_WINDOW> = ControlLoop::new(
        sensor,
        RelayHeater::new(relay),
        DefmtTelemetry,
        Delay,
        &config,
    );
    control.run().await
}
