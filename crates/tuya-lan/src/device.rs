//! Device configuration, connection, and session.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value, json};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::crypto::{self, HMAC_LEN, KEY_LEN, Key};
use crate::error::{Error, Result};
use crate::frame::{self, Codec};

/// TCP port devices listen on for LAN control.
pub const DEFAULT_PORT: u16 = 6668;

/// Frames skipped while waiting for a specific reply before giving up.
const MAX_SKIPPED_FRAMES: usize = 16;

const NONCE_LEN: usize = 16;

/// Protocol version spoken by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    V3_1,
    V3_2,
    V3_3,
    V3_4,
    V3_5,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::V3_1 => "3.1",
            Version::V3_2 => "3.2",
            Version::V3_3 => "3.3",
            Version::V3_4 => "3.4",
            Version::V3_5 => "3.5",
        }
    }

    /// 3.4 and later negotiate a session key after connecting.
    pub fn negotiates(self) -> bool {
        matches!(self, Version::V3_4 | Version::V3_5)
    }

    /// 15-byte marker placed in front of control payloads: the version string
    /// followed by twelve zero bytes.
    fn header(self) -> [u8; 15] {
        let mut h = [0u8; 15];
        h[..3].copy_from_slice(self.as_str().as_bytes());
        h
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "3.1" => Ok(Version::V3_1),
            "3.2" => Ok(Version::V3_2),
            "3.3" => Ok(Version::V3_3),
            "3.4" => Ok(Version::V3_4),
            "3.5" => Ok(Version::V3_5),
            other => Err(Error::InvalidConfig(format!(
                "unsupported protocol version \"{other}\" (expected 3.1 to 3.5)"
            ))),
        }
    }
}

/// Credentials and address of one device.
#[derive(Clone)]
pub struct DeviceConfig {
    pub id: String,
    pub ip: String,
    pub version: Version,
    key: Key,
}

impl DeviceConfig {
    /// Build a config. The local key must be exactly 16 bytes.
    pub fn new(id: &str, key: &str, ip: &str, version: &str) -> Result<Self> {
        let key: Key = key.as_bytes().try_into().map_err(|_| {
            Error::InvalidConfig(format!(
                "local key must be {KEY_LEN} characters, got {}",
                key.len()
            ))
        })?;
        Ok(DeviceConfig {
            id: id.to_string(),
            ip: ip.to_string(),
            version: version.parse()?,
            key,
        })
    }
}

impl fmt::Debug for DeviceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceConfig")
            .field("id", &self.id)
            .field("ip", &self.ip)
            .field("version", &self.version)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// A device that can be connected to.
#[derive(Debug, Clone)]
pub struct Device {
    config: DeviceConfig,
    port: u16,
}

impl Device {
    pub fn new(config: DeviceConfig) -> Self {
        Device {
            config,
            port: DEFAULT_PORT,
        }
    }

    /// Override the TCP port (tests, port-forwarded devices).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Resolve the device's socket address.
    ///
    /// With both id and IP known there is nothing to scan for; the address is
    /// validated and returned.
    pub async fn find(&self) -> Result<SocketAddr> {
        if self.config.id.trim().is_empty() {
            return Err(Error::InvalidConfig("device id is empty".into()));
        }
        let ip: IpAddr = self.config.ip.trim().parse().map_err(|_| {
            Error::InvalidConfig(format!("invalid IP address \"{}\"", self.config.ip))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Open a session. For 3.4 and 3.5 this negotiates a session key.
    pub async fn connect(&self) -> Result<Session> {
        let addr = self.find().await?;
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        log::debug!("{}: connected (protocol {})", self.config.ip, self.config.version);

        let key = self.config.key;
        let codec = match self.config.version {
            Version::V3_1 | Version::V3_2 | Version::V3_3 => Codec::Crc,
            Version::V3_4 => Codec::Hmac(key),
            Version::V3_5 => Codec::Gcm(key),
        };
        let mut session = Session {
            stream,
            config: self.config.clone(),
            codec,
            seq: 0,
        };
        if session.config.version.negotiates() {
            session.negotiate().await?;
        }
        Ok(session)
    }
}

/// An open connection to a device. Dropping it closes the socket.
pub struct Session {
    stream: TcpStream,
    config: DeviceConfig,
    codec: Codec,
    seq: u32,
}

impl Session {
    /// Write several data points in one command and wait for the device's
    /// acknowledgement.
    pub async fn set_multiple(&mut self, dps: &Map<String, Value>) -> Result<()> {
        let version = self.config.version;
        let json = serde_json::to_vec(&self.control_body(dps))?;
        let (cmd, payload) = match version {
            Version::V3_1 => (frame::CMD_CONTROL, signed_v31_payload(&self.config.key, &json)?),
            Version::V3_2 | Version::V3_3 => {
                let mut p = version.header().to_vec();
                p.extend(crypto::ecb_encrypt(&self.config.key, &json, true)?);
                (frame::CMD_CONTROL, p)
            }
            Version::V3_4 => {
                let mut plain = version.header().to_vec();
                plain.extend_from_slice(&json);
                let key = self.session_key()?;
                (frame::CMD_CONTROL_NEW, crypto::ecb_encrypt(&key, &plain, true)?)
            }
            Version::V3_5 => {
                let mut p = version.header().to_vec();
                p.extend_from_slice(&json);
                (frame::CMD_CONTROL_NEW, p)
            }
        };
        self.send(cmd, &payload).await?;
        let reply = self.recv(cmd).await?;
        match reply.retcode {
            Some(0) | None => Ok(()),
            Some(code) => Err(Error::Device { code }),
        }
    }

    /// Close the connection.
    pub async fn disconnect(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        log::debug!("{}: disconnected", self.config.ip);
        Ok(())
    }

    fn control_body(&self, dps: &Map<String, Value>) -> Value {
        let t = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        match self.config.version {
            Version::V3_1 | Version::V3_2 | Version::V3_3 => json!({
                "devId": self.config.id,
                "uid": self.config.id,
                "t": t.to_string(),
                "dps": dps,
            }),
            _ => json!({
                "protocol": 5,
                "t": t,
                "data": { "dps": dps },
            }),
        }
    }

    fn session_key(&self) -> Result<Key> {
        match &self.codec {
            Codec::Hmac(k) | Codec::Gcm(k) => Ok(*k),
            Codec::Crc => Err(Error::Negotiation(format!(
                "no session key for protocol {}",
                self.config.version
            ))),
        }
    }

    async fn negotiate(&mut self) -> Result<()> {
        let version = self.config.version;
        let key = self.config.key;
        let local_nonce: [u8; NONCE_LEN] = rand::random();

        let start = match version {
            Version::V3_4 => crypto::ecb_encrypt(&key, &local_nonce, true)?,
            _ => local_nonce.to_vec(),
        };
        self.send(frame::CMD_SESS_KEY_NEG_START, &start).await?;

        let reply = self.recv(frame::CMD_SESS_KEY_NEG_RESP).await?;
        if let Some(code) = reply.retcode
            && code != 0
        {
            return Err(Error::Negotiation(format!("device rejected handshake (code {code})")));
        }
        let body = match version {
            Version::V3_4 => crypto::ecb_decrypt(&key, &reply.payload)?,
            _ => reply.payload,
        };
        if body.len() < NONCE_LEN + HMAC_LEN {
            return Err(Error::Negotiation(format!(
                "handshake reply too short ({} bytes)",
                body.len()
            )));
        }
        let mut remote_nonce = [0u8; NONCE_LEN];
        remote_nonce.copy_from_slice(&body[..NONCE_LEN]);
        if !crypto::verify_hmac(&key, &local_nonce, &body[NONCE_LEN..NONCE_LEN + HMAC_LEN]) {
            return Err(Error::Negotiation(
                "device proof does not match (wrong local key?)".into(),
            ));
        }

        let proof = crypto::hmac_sha256(&key, &remote_nonce)?;
        let finish = match version {
            Version::V3_4 => crypto::ecb_encrypt(&key, &proof, true)?,
            _ => proof.to_vec(),
        };
        self.send(frame::CMD_SESS_KEY_NEG_FINISH, &finish).await?;

        let session_key = derive_session_key(version, &key, &local_nonce, &remote_nonce)?;
        self.codec = match version {
            Version::V3_4 => Codec::Hmac(session_key),
            _ => Codec::Gcm(session_key),
        };
        log::debug!("{}: session key negotiated", self.config.ip);
        Ok(())
    }

    async fn send(&mut self, cmd: u32, payload: &[u8]) -> Result<()> {
        self.seq = self.seq.wrapping_add(1);
        let bytes = self.codec.encode(self.seq, cmd, payload)?;
        self.stream.write_all(&bytes).await?;
        Ok(())
    }

    /// Read frames until one with the given command arrives.
    async fn recv(&mut self, cmd: u32) -> Result<frame::Message> {
        for _ in 0..MAX_SKIPPED_FRAMES {
            let raw = frame::read_frame(&mut self.stream).await?;
            let msg = self.codec.decode(&raw, true)?;
            if msg.cmd == cmd {
                return Ok(msg);
            }
            if msg.cmd == frame::CMD_STATUS {
                log::debug!("{}: skipping status push", self.config.ip);
            } else {
                log::debug!("{}: skipping frame with command {}", self.config.ip, msg.cmd);
            }
        }
        Err(Error::Frame(format!("no reply to command {cmd}")))
    }
}

/// 3.1 control payload: `"3.1" + md5[8..24] + base64(ecb(json))`, where the
/// digest covers `data=<base64>||lpv=3.1||<local key>`.
fn signed_v31_payload(key: &Key, json: &[u8]) -> Result<Vec<u8>> {
    let data = BASE64.encode(crypto::ecb_encrypt(key, json, true)?);
    let mut signed = format!("data={data}||lpv=3.1||").into_bytes();
    signed.extend_from_slice(key);
    let digest = crypto::md5_hex(&signed);

    let mut out = b"3.1".to_vec();
    out.extend_from_slice(digest[8..24].as_bytes());
    out.extend_from_slice(data.as_bytes());
    Ok(out)
}

/// Session key = `encrypt(local_key, local_nonce XOR remote_nonce)`; ECB for
/// 3.4, GCM (IV = first 12 bytes of the local nonce, tag dropped) for 3.5.
fn derive_session_key(
    version: Version,
    key: &Key,
    local_nonce: &[u8; NONCE_LEN],
    remote_nonce: &[u8; NONCE_LEN],
) -> Result<Key> {
    let mut mixed = [0u8; NONCE_LEN];
    for (i, b) in mixed.iter_mut().enumerate() {
        *b = local_nonce[i] ^ remote_nonce[i];
    }
    let sealed = match version {
        Version::V3_5 => {
            let mut iv = [0u8; 12];
            iv.copy_from_slice(&local_nonce[..12]);
            crypto::gcm_encrypt(key, &iv, &[], &mixed)?
        }
        _ => crypto::ecb_encrypt(key, &mixed, false)?,
    };
    let mut out = [0u8; KEY_LEN];
    out.copy_from_slice(&sealed[..KEY_LEN]);
    Ok(out)
}
