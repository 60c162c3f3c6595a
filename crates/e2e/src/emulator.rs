//! Control of the network emulator
//!
//! The emulator control process exposes a small XML-RPC interface that
//! adds and removes switches and links and points them at a controller.

use std::time::Duration;
use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info};

use crate::error::{E2eError, E2eResult};

/// Mutations the scenarios apply to the emulated network
#[async_trait]
pub trait EmulatorControl: Send + Sync {
    /// Point emulated switches at the controller listening on `host:port`
    async fn add_controller(&self, host: &str, port: u16) -> E2eResult<()>;
    async fn add_switch(&self, name: &str) -> E2eResult<()>;
    async fn del_switch(&self, name: &str) -> E2eResult<()>;
    async fn add_link(&self, a: &str, b: &str) -> E2eResult<()>;
    async fn del_link(&self, a: &str, b: &str) -> E2eResult<()>;
    /// Tear down the whole emulated network
    async fn stop(&self) -> E2eResult<()>;
}

/// XML-RPC parameter
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    Str(String),
    Int(i64),
}

impl From<&str> for RpcValue {
    fn from(s: &str) -> Self {
        RpcValue::Str(s.to_string())
    }
}

impl From<u16> for RpcValue {
    fn from(n: u16) -> Self {
        RpcValue::Int(n.into())
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape(s: &str) -> String {
    let Ok(entity) = Regex::new(r"&(lt|gt|quot|apos|amp|#[0-9]+|#x[0-9a-fA-F]+);") else {
        return s.to_string();
    };
    entity
        .replace_all(s, |c: &regex::Captures| match &c[1] {
            "lt" => "<".to_string(),
            "gt" => ">".to_string(),
            "quot" => "\"".to_string(),
            "apos" => "'".to_string(),
            "amp" => "&".to_string(),
            reference => {
                let code = match reference.strip_prefix("#x") {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => reference[1..].parse().ok(),
                };
                code.and_then(char::from_u32)
                    .map(String::from)
                    .unwrap_or_else(|| c[0].to_string())
            }
        })
        .into_owned()
}

/// Body of an XML-RPC `methodCall`
pub fn encode_call(method: &str, params: &[RpcValue]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<methodCall>");
    xml.push_str(&format!("<methodName>{}</methodName><params>", escape(method)));
    for param in params {
        let value = match param {
            RpcValue::Str(s) => format!("<string>{}</string>", escape(s)),
            RpcValue::Int(n) => format!("<int>{}</int>", n),
        };
        xml.push_str(&format!("<param><value>{}</value></param>", value));
    }
    xml.push_str("</params></methodCall>\n");
    xml
}

/// Interprets a `methodResponse`: a fault becomes `Err(faultString)`.
///
/// The return value itself carries no information for these calls.
pub fn decode_response(body: &str) -> Result<(), String> {
    let response = Regex::new(r"(?s)<methodResponse\b[^>]*>(.*)</methodResponse>")
        .map_err(|e| e.to_string())?;
    let Some(content) = response.captures(body).and_then(|c| c.get(1)) else {
        return Err(format!("not an XML-RPC response: {}", body.trim()));
    };

    let fault = Regex::new(r"(?s)^\s*<fault\s*>(.*)</fault>\s*$").map_err(|e| e.to_string())?;
    let Some(fault) = fault.captures(content.as_str()).and_then(|c| c.get(1)) else {
        return Ok(());
    };

    // a `</value>` only closes the member when `</member>` follows it
    let member = Regex::new(
        r"(?s)<member>\s*<name>\s*faultString\s*</name>\s*<value>(.*?)</value>\s*</member>",
    )
    .map_err(|e| e.to_string())?;
    match member.captures(fault.as_str()).and_then(|c| c.get(1)) {
        Some(value) => Err(fault_text(value.as_str())),
        None => Err("unknown fault".to_string()),
    }
}

/// Text of a fault value, typed `<string>` or untyped
fn fault_text(value: &str) -> String {
    let trimmed = value.trim();
    let text = match trimmed
        .strip_prefix("<string>")
        .and_then(|v| v.strip_suffix("</string>"))
    {
        Some(inner) => inner,
        None if trimmed == "<string/>" => "",
        None => value,
    };
    unescape(text)
}

/// [`EmulatorControl`] over XML-RPC
pub struct XmlRpcEmulator {
    client: reqwest::Client,
    url: String,
}

impl XmlRpcEmulator {
    pub fn new(url: impl Into<String>) -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    async fn call(&self, method: &str, params: &[RpcValue]) -> E2eResult<()> {
        debug!("emulator {}({:?})", method, params);
        let resp = self
            .client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(encode_call(method, params))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(E2eError::Emulator {
                method: method.to_string(),
                reason: format!("HTTP {}", status),
            });
        }
        decode_response(&body).map_err(|reason| E2eError::Emulator {
            method: method.to_string(),
            reason,
        })
    }
}

#[async_trait]
impl EmulatorControl for XmlRpcEmulator {
    async fn add_controller(&self, host: &str, port: u16) -> E2eResult<()> {
        info!("emulator: controller {}:{}", host, port);
        self.call("add_controller", &[host.into(), port.into()]).await
    }

    async fn add_switch(&self, name: &str) -> E2eResult<()> {
        info!("emulator: add switch {}", name);
        self.call("add_switch", &[name.into()]).await
    }

    async fn del_switch(&self, name: &str) -> E2eResult<()> {
        info!("emulator: del switch {}", name);
        self.call("del_switch", &[name.into()]).await
    }

    async fn add_link(&self, a: &str, b: &str) -> E2eResult<()> {
        info!("emulator: add link {} - {}", a, b);
        self.call("add_link", &[a.into(), b.into()]).await
    }

    async fn del_link(&self, a: &str, b: &str) -> E2eResult<()> {
        info!("emulator: del link {} - {}", a, b);
        self.call("del_link", &[a.into(), b.into()]).await
    }

    async fn stop(&self) -> E2eResult<()> {
        info!("emulator: stop");
        self.call("stop", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_call() {
        let xml = encode_call("add_controller", &["127.0.0.1".into(), 6633u16.into()]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\"?>\n<methodCall><methodName>add_controller</methodName><params>\
             <param><value><string>127.0.0.1</string></value></param>\
             <param><value><int>6633</int></value></param>\
             </params></methodCall>\n"
        );
    }

    #[test]
    fn test_encode_escapes_strings() {
        let xml = encode_call("add_switch", &["a<&>b".into()]);
        assert!(xml.contains("<string>a&lt;&amp;&gt;b</string>"));
    }

    #[test]
    fn test_encode_no_params() {
        let xml = encode_call("stop", &[]);
        assert!(xml.contains("<methodName>stop</methodName><params></params>"));
    }

    #[test]
    fn test_decode_nil_response() {
        let body = "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n\
                    <value><nil/></value></param>\n</params>\n</methodResponse>\n";
        assert_eq!(decode_response(body), Ok(()));
    }

    #[test]
    fn test_decode_fault() {
        let body = r#"<?xml version='1.0'?>
<methodResponse>
<fault>
<value><struct>
<member>
<name>faultCode</name>
<value><int>1</int></value>
</member>
<member>
<name>faultString</name>
<value><string>&lt;type 'exceptions.KeyError'&gt;:'s9'</string></value>
</member>
</struct></value>
</fault>
</methodResponse>
"#;
        assert_eq!(
            decode_response(body),
            Err("<type 'exceptions.KeyError'>:'s9'".to_string())
        );
    }

    #[test]
    fn test_decode_garbage() {
        assert!(decode_response("<html>502 Bad Gateway</html>").is_err());
    }

    fn fault_body(members: &str) -> String {
        format!(
            "<?xml version='1.0'?>\n<methodResponse>\n<fault>\n<value><struct>\n{}\n\
             </struct></value>\n</fault>\n</methodResponse>\n",
            members
        )
    }

    #[test]
    fn test_decode_fault_string_first() {
        let body = fault_body(
            "<member><name>faultString</name><value>no such switch &#39;s9&#x27;</value></member>\n\
             <member><name>faultCode</name><value><int>1</int></value></member>",
        );
        assert_eq!(decode_response(&body), Err("no such switch 's9'".to_string()));
    }

    #[test]
    fn test_decode_fault_with_markup_in_message() {
        let body = fault_body(
            "<member><name>faultCode</name><value><int>1</int></value></member>\n\
             <member><name>faultString</name>\
             <value><string>bad <b>link</b> s1-s2 </value> &amp;lt;</string></value>\
             </member>",
        );
        assert_eq!(
            decode_response(&body),
            Err("bad <b>link</b> s1-s2 </value> &lt;".to_string())
        );
    }

    #[test]
    fn test_decode_escaped_fault_in_result() {
        let body = "<?xml version='1.0'?>\n<methodResponse>\n<params>\n<param>\n\
                    <value><string>&lt;fault&gt;</string></value></param>\n</params>\n\
                    </methodResponse>\n";
        assert_eq!(decode_response(body), Ok(()));
    }

    #[test]
    fn test_decode_fault_without_message() {
        let body = fault_body("<member><name>faultCode</name><value><int>1</int></value></member>");
        assert_eq!(decode_response(&body), Err("unknown fault".to_string()));
    }
}
