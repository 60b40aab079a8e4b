use serde::Serialize;

/// A serial port visible to this machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub port_name: String,
    pub port_type: String,
}

/// Return a sorted list of available serial ports.
pub fn enumerate_ports() -> Vec<PortInfo> {
    let mut ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(err) => {
            log::warn!("Failed to enumerate serial ports: {}", err);
            return Vec::new();
        }
    };
    ports.sort_by(|a, b| a.port_name.cmp(&b.port_name));

    ports
        .into_iter()
        .map(|p| PortInfo {
            port_type: port_type_name(&p.port_type),
            port_name: p.port_name,
        })
        .collect()
}

fn port_type_name(port_type: &serialport::SerialPortType) -> String {
    match port_type {
        serialport::SerialPortType::UsbPort(info) => match &info.product {
            Some(product) => format!("USB ({product})"),
            None => format!("USB {:04x}:{:04x}", info.vid, info.pid),
        },
        serialport::SerialPortType::PciPort => "PCI".to_string(),
        serialport::SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        serialport::SerialPortType::Unknown => "Unknown".to_string(),
    }
}
