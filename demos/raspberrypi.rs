use embedded_hal::delay::DelayNs;
use ens160::{Builder, DEFAULT_I2C_ADDRESS};
use linux_embedded_hal::{Delay, I2cdev};

fn main() {
    let i2c = I2cdev::new("/dev/i2c-1").expect("I2C device");

    //initialize the sensor through i2c
    //wire SDO to VCC and use ALTERNATE_I2C_ADDRESS instead if 0x52 is taken
    let mut sensor = Builder::new_i2c(i2c, DEFAULT_I2C_ADDRESS);

    //you need to provide a delay_source
    let mut delay_source = Delay {};

    sensor.setup(&mut delay_source).expect("error setup");

    //feed the gas measurement engine the current room conditions
    sensor
        .set_compensation(25.0, 50.0)
        .expect("error set_compensation");

    loop {
        let status = sensor.get_status().expect("error status");
        if status.new_data() {
            let aqi = sensor.get_aqi().unwrap();
            let tvoc = sensor.get_tvoc().unwrap();
            let eco2 = sensor.get_eco2().unwrap();
            println!("validity: {:?}", status.validity());
            println!("AQI (UBA): {}", aqi);
            println!("TVOC: {} ppb", tvoc);
            println!("eCO2: {} ppm", eco2);
            println!(
                "checksum ok: {}",
                sensor.verify_checksum().unwrap()
            );
        }
        delay_source.delay_ms(1000);
    }
}
