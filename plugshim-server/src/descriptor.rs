//! Device and service description documents.

use plugshim_device::wire::{
    CONTROL_PATH, DEVICE_TYPE, EVENT_SERVICE_PATH, EVENT_SUB_PATH, SERVICE_ID, SERVICE_TYPE,
};
use plugshim_device::Device;
use quick_xml::escape::escape;

/// `/setup.xml` for a device.
pub fn setup_xml(device: &Device) -> String {
    format!(
        r#"<?xml version="1.0"?>
<root xmlns="urn:Belkin:device-1-0">
<specVersion><major>1</major><minor>0</minor></specVersion>
<device>
<deviceType>{device_type}</deviceType>
<friendlyName>{name}</friendlyName>
<manufacturer>Belkin International Inc.</manufacturer>
<modelName>Emulated Socket</modelName>
<modelNumber>3.1415</modelNumber>
<modelDescription>Belkin Plugin Socket 1.0</modelDescription>
<UDN>{udn}</UDN>
<serialNumber>{serial}</serialNumber>
<binaryState>0</binaryState>
<serviceList>
<service>
<serviceType>{service_type}</serviceType>
<serviceId>{service_id}</serviceId>
<controlURL>{control}</controlURL>
<eventSubURL>{event_sub}</eventSubURL>
<SCPDURL>{scpd}</SCPDURL>
</service>
</serviceList>
</device>
</root>
"#,
        device_type = DEVICE_TYPE,
        name = escape(device.name()),
        udn = device.udn(),
        serial = device.serial(),
        service_type = SERVICE_TYPE,
        service_id = SERVICE_ID,
        control = CONTROL_PATH,
        event_sub = EVENT_SUB_PATH,
        scpd = EVENT_SERVICE_PATH,
    )
}

/// `/eventservice.xml`: the basicevent service description.
pub fn event_service_xml() -> String {
    let action = |name: &str, argument: &str, direction: &str, variable: &str| {
        format!(
            "<action><name>{name}</name><argumentList><argument>\
             <name>{argument}</name><relatedStateVariable>{variable}</relatedStateVariable>\
             <direction>{direction}</direction></argument></argumentList></action>"
        )
    };

    format!(
        r#"<?xml version="1.0"?>
<scpd xmlns="urn:Belkin:service-1-0">
<specVersion><major>1</major><minor>0</minor></specVersion>
<actionList>{set}{get}{name}</actionList>
<serviceStateTable>
<stateVariable sendEvents="yes"><name>BinaryState</name><dataType>string</dataType><defaultValue>0</defaultValue></stateVariable>
<stateVariable sendEvents="yes"><name>FriendlyName</name><dataType>string</dataType></stateVariable>
</serviceStateTable>
</scpd>
"#,
        set = action("SetBinaryState", "BinaryState", "in", "BinaryState"),
        get = action("GetBinaryState", "BinaryState", "out", "BinaryState"),
        name = action("GetFriendlyName", "FriendlyName", "out", "FriendlyName"),
    )
}
