use crate::error::{Error, Result};
use reqwest::blocking::Client as HttpClient;
use roxmltree::{Document, Node};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

const SENSOR_TAG: &str = "sns";
const STATE_OK: &str = "0";

pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// One sensor entry of a gateway status response.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub name: String,
    pub state: String,
    pub value: f64,
    /// Gateway acknowledgment counter, not the row timestamp.
    pub timestamp: i64,
}

impl SensorReading {
    pub fn is_ok(&self) -> bool {
        self.state == STATE_OK
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorSnapshot {
    readings: Vec<SensorReading>,
    names: Vec<String>,
}

impl SensorSnapshot {
    pub fn new(readings: Vec<SensorReading>) -> Self {
        let names = readings.iter().map(|r| r.name.clone()).collect();
        Self { readings, names }
    }

    pub fn readings(&self) -> &[SensorReading] {
        &self.readings
    }

    /// Sensor names in response order, duplicates kept.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Header for a fresh output file: `timestamp` then the sensor names.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(self.names.len() + 1);
        columns.push(TIMESTAMP_COLUMN.to_string());
        columns.extend(self.names().iter().cloned());
        columns
    }

    /// Values of the sensors reporting an OK state, keyed by name.
    ///
    /// When a name repeats, the last OK reading wins.
    pub fn ok_values(&self) -> HashMap<&str, f64> {
        self.readings
            .iter()
            .filter(|reading| reading.is_ok())
            .map(|reading| (reading.name.as_str(), reading.value))
            .collect()
    }
}

pub fn build_client(timeout: Duration) -> Result<HttpClient, reqwest::Error> {
    HttpClient::builder().timeout(timeout).build()
}

/// Single GET against the gateway; no retries.
pub fn fetch(client: &HttpClient, endpoint: &Url) -> Result<SensorSnapshot> {
    let body = fetch_body(client, endpoint).map_err(|err| {
        tracing::error!(endpoint = %endpoint, error = %err, "could not connect to gateway");
        err
    })?;

    let snapshot = parse_snapshot(&body).map_err(|err| {
        tracing::error!(endpoint = %endpoint, error = %err, "could not parse gateway response");
        err
    })?;
    tracing::debug!(sensors = snapshot.readings().len(), "fetched sensor snapshot");
    for reading in snapshot.readings() {
        tracing::trace!(
            sensor = %reading.name,
            state = %reading.state,
            value = reading.value,
            ack = reading.timestamp,
            "sensor reading"
        );
    }
    Ok(snapshot)
}

fn fetch_body(client: &HttpClient, endpoint: &Url) -> Result<String> {
    let network = |source| Error::Network {
        endpoint: endpoint.to_string(),
        source,
    };
    let resp = client.get(endpoint.clone()).send().map_err(network)?;
    if !resp.status().is_success() {
        return Err(Error::HttpStatus {
            endpoint: endpoint.to_string(),
            status: resp.status(),
        });
    }
    resp.text().map_err(network)
}

/// Every `<sns>` element anywhere in the document becomes one reading.
/// A bad element fails the whole snapshot.
pub fn parse_snapshot(xml: &str) -> Result<SensorSnapshot> {
    let doc = Document::parse(xml)?;
    let readings = doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == SENSOR_TAG)
        .enumerate()
        .map(|(idx, node)| parse_reading(idx, &node))
        .collect::<Result<Vec<_>>>()?;
    Ok(SensorSnapshot::new(readings))
}

fn parse_reading(element: usize, node: &Node) -> Result<SensorReading> {
    let attr = |attribute: &'static str| {
        node.attribute(attribute)
            .ok_or(Error::MissingAttribute { element, attribute })
    };

    let raw_value = attr("v1")?;
    // v1 carries one implied fractional digit.
    let value = raw_value
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::InvalidNumber {
            element,
            attribute: "v1",
            value: raw_value.to_string(),
        })?
        / 10.0;

    let raw_ack = attr("ack_cas")?;
    let timestamp = raw_ack
        .trim()
        .parse::<i64>()
        .map_err(|_| Error::InvalidNumber {
            element,
            attribute: "ack_cas",
            value: raw_ack.to_string(),
        })?;

    Ok(SensorReading {
        name: attr("name")?.to_string(),
        state: attr("s1")?.to_string(),
        value,
        timestamp,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    pub(crate) fn reading(name: &str, state: &str, value: f64) -> SensorReading {
        SensorReading {
            name: name.to_string(),
            state: state.to_string(),
            value,
            timestamp: 0,
        }
    }

    const FRESH_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<root>
  <header><sn>11234</sn></header>
  <sns id="1" name="livingroom" s1="0" v1="215" ack_cas="1718000000" />
  <group>
    <sns id="2" name="kitchen" s1="0" v1="-32" ack_cas="1718000001" />
  </group>
  <sns id="3" name="garage" s1="2" v1="0" ack_cas="0" />
</root>"#;

    #[test]
    fn parses_sensors_in_document_order() {
        let snapshot = parse_snapshot(FRESH_XML).unwrap();
        assert_eq!(snapshot.names(), ["livingroom", "kitchen", "garage"]);

        let living = &snapshot.readings()[0];
        assert_eq!(living.state, "0");
        assert!((living.value - 21.5).abs() < 1e-9);
        assert_eq!(living.timestamp, 1_718_000_000);

        let kitchen = &snapshot.readings()[1];
        assert!((kitchen.value + 3.2).abs() < 1e-9);
        assert!(!snapshot.readings()[2].is_ok());
    }

    #[test]
    fn document_without_sensors_yields_empty_snapshot() {
        let snapshot = parse_snapshot("<root><other/></root>").unwrap();
        assert!(snapshot.readings().is_empty());
        assert_eq!(snapshot.columns(), ["timestamp"]);
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = parse_snapshot("<root><sns name=").unwrap_err();
        assert!(err.is_parse());
        assert!(matches!(err, Error::Xml(_)));
    }

    #[test]
    fn missing_attribute_fails_whole_snapshot() {
        let xml = r#"<root>
            <sns name="a" s1="0" v1="10" ack_cas="1"/>
            <sns name="b" s1="0" ack_cas="1"/>
        </root>"#;
        let err = parse_snapshot(xml).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingAttribute {
                element: 1,
                attribute: "v1"
            }
        ));
    }

    #[test]
    fn non_numeric_values_are_rejected() {
        let xml = r#"<root><sns name="a" s1="0" v1="warm" ack_cas="1"/></root>"#;
        assert!(matches!(
            parse_snapshot(xml).unwrap_err(),
            Error::InvalidNumber { attribute: "v1", .. }
        ));

        let xml = r#"<root><sns name="a" s1="0" v1="10" ack_cas="1.5"/></root>"#;
        assert!(matches!(
            parse_snapshot(xml).unwrap_err(),
            Error::InvalidNumber {
                attribute: "ack_cas",
                ..
            }
        ));
    }

    #[test]
    fn columns_keep_duplicate_names() {
        let snapshot = SensorSnapshot::new(vec![
            reading("a", "0", 1.0),
            reading("b", "0", 2.0),
            reading("a", "0", 3.0),
        ]);
        assert_eq!(snapshot.columns(), ["timestamp", "a", "b", "a"]);
    }

    #[test]
    fn ok_values_skip_faulty_sensors_and_last_duplicate_wins() {
        let snapshot = SensorSnapshot::new(vec![
            reading("a", "0", 1.0),
            reading("b", "1", 2.0),
            reading("a", "0", 3.0),
            reading("c", "0", 4.0),
            reading("c", "5", 5.0),
        ]);
        let values = snapshot.ok_values();
        assert_eq!(values.len(), 2);
        assert_eq!(values["a"], 3.0);
        assert_eq!(values["c"], 4.0);
        assert!(!values.contains_key("b"));
    }

    pub(crate) fn serve_once(status_line: &'static str, body: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "{status_line}\r\nContent-Type: text/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        Url::parse(&format!("http://{addr}/fresh.xml")).unwrap()
    }

    #[test]
    fn fetch_parses_gateway_response() {
        let endpoint = serve_once("HTTP/1.1 200 OK", FRESH_XML);
        let client = build_client(Duration::from_secs(5)).unwrap();
        let snapshot = fetch(&client, &endpoint).unwrap();
        assert_eq!(snapshot.names(), ["livingroom", "kitchen", "garage"]);
    }

    #[test]
    fn fetch_rejects_non_success_status() {
        let endpoint = serve_once("HTTP/1.1 503 Service Unavailable", "busy");
        let client = build_client(Duration::from_secs(5)).unwrap();
        let err = fetch(&client, &endpoint).unwrap_err();
        assert!(err.is_network());
        assert!(matches!(err, Error::HttpStatus { status, .. } if status.as_u16() == 503));
    }

    #[test]
    fn fetch_reports_unreachable_gateway() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let endpoint = Url::parse(&format!("http://{addr}/fresh.xml")).unwrap();
        let client = build_client(Duration::from_secs(2)).unwrap();
        let err = fetch(&client, &endpoint).unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
    }

    #[test]
    fn fetch_reports_unparseable_body() {
        let endpoint = serve_once("HTTP/1.1 200 OK", "<root><sns");
        let client = build_client(Duration::from_secs(5)).unwrap();
        assert!(fetch(&client, &endpoint).unwrap_err().is_parse());
    }
}
