//! Wire framing for the Tuya LAN protocol.
//!
//! Two frame layouts exist:
//!
//! - `0x000055AA` (3.1 – 3.4):
//!   `[prefix:u32][seq:u32][cmd:u32][len:u32][payload][crc32:u32 | hmac:32][suffix:u32]`
//!   where `len` counts everything after the header. 3.3 protects the frame
//!   with a CRC32; 3.4 with HMAC-SHA256 keyed by the session key.
//! - `0x00006699` (3.5):
//!   `[prefix:u32][reserved:u16][seq:u32][cmd:u32][len:u32][iv:12][ciphertext][tag:16][suffix:u32]`
//!   where the whole payload is AES-GCM sealed, bytes `4..18` of the header
//!   are the additional authenticated data, and `len` counts IV, ciphertext
//!   and tag but not the suffix.
//!
//! All integers are big-endian. Frames sent by a device start their payload
//! with a `u32` return code; frames sent by a client do not.

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::crypto::{self, HMAC_LEN, Key};
use crate::error::{Error, Result};

// ── Frame markers ──

pub(crate) const PREFIX_55AA: u32 = 0x0000_55AA;
pub(crate) const SUFFIX_55AA: u32 = 0x0000_AA55;
pub(crate) const PREFIX_6699: u32 = 0x0000_6699;
pub(crate) const SUFFIX_6699: u32 = 0x0000_9966;

pub(crate) const HEADER_LEN_55AA: usize = 16;
pub(crate) const HEADER_LEN_6699: usize = 18;
const SUFFIX_LEN: usize = 4;
const CRC_LEN: usize = 4;
const GCM_IV_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;
const RETCODE_LEN: usize = 4;

/// Upper bound on a frame body; real devices stay well under 4 KiB.
pub(crate) const MAX_FRAME_LEN: usize = 64 * 1024;

// ── Command codes ──

/// Client → device: start session key negotiation (3.4+).
pub(crate) const CMD_SESS_KEY_NEG_START: u32 = 0x03;
/// Device → client: negotiation response carrying the remote nonce.
pub(crate) const CMD_SESS_KEY_NEG_RESP: u32 = 0x04;
/// Client → device: finish negotiation.
pub(crate) const CMD_SESS_KEY_NEG_FINISH: u32 = 0x05;
/// Set data points (3.3 and older).
pub(crate) const CMD_CONTROL: u32 = 0x07;
/// Unsolicited status push.
pub(crate) const CMD_STATUS: u32 = 0x08;
/// Set data points (3.4+).
pub(crate) const CMD_CONTROL_NEW: u32 = 0x0D;

/// A decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Message {
    pub seq: u32,
    pub cmd: u32,
    /// Return code, present on most frames sent by a device.
    pub retcode: Option<u32>,
    /// Payload after the return code. For 3.5 this is already decrypted.
    pub payload: Vec<u8>,
}

/// Frame-level protection in effect for a session.
#[derive(Clone)]
pub(crate) enum Codec {
    /// `55AA` frame, CRC32 trailer (3.3).
    Crc,
    /// `55AA` frame, HMAC-SHA256 trailer (3.4).
    Hmac(Key),
    /// `6699` frame, AES-GCM sealed payload (3.5).
    Gcm(Key),
}

impl Codec {
    /// Encode a client frame. GCM frames get a random IV.
    pub fn encode(&self, seq: u32, cmd: u32, payload: &[u8]) -> Result<Vec<u8>> {
        match self {
            Codec::Gcm(key) => encode_6699(key, &rand::random::<[u8; GCM_IV_LEN]>(), seq, cmd, payload),
            _ => self.encode_55aa(seq, cmd, payload),
        }
    }

    fn encode_55aa(&self, seq: u32, cmd: u32, payload: &[u8]) -> Result<Vec<u8>> {
        let trailer_len = match self {
            Codec::Hmac(_) => HMAC_LEN,
            _ => CRC_LEN,
        };
        let len = payload.len() + trailer_len + SUFFIX_LEN;
        let mut out = Vec::with_capacity(HEADER_LEN_55AA + len);
        out.extend_from_slice(&PREFIX_55AA.to_be_bytes());
        out.extend_from_slice(&seq.to_be_bytes());
        out.extend_from_slice(&cmd.to_be_bytes());
        out.extend_from_slice(&(len as u32).to_be_bytes());
        out.extend_from_slice(payload);
        match self {
            Codec::Hmac(key) => {
                let tag = crypto::hmac_sha256(key, &out)?;
                out.extend_from_slice(&tag);
            }
            _ => {
                let crc = crypto::crc32(&out);
                out.extend_from_slice(&crc.to_be_bytes());
            }
        }
        out.extend_from_slice(&SUFFIX_55AA.to_be_bytes());
        Ok(out)
    }

    /// Decode a complete frame. With `from_device`, a leading return code is
    /// split off the payload when present.
    pub fn decode(&self, frame: &[u8], from_device: bool) -> Result<Message> {
        let (seq, cmd, payload) = match self {
            Codec::Gcm(key) => decode_6699(key, frame)?,
            _ => self.decode_55aa(frame)?,
        };
        let (retcode, payload) = if from_device {
            split_retcode(payload)
        } else {
            (None, payload)
        };
        Ok(Message {
            seq,
            cmd,
            retcode,
            payload,
        })
    }

    fn decode_55aa(&self, frame: &[u8]) -> Result<(u32, u32, Vec<u8>)> {
        let trailer_len = match self {
            Codec::Hmac(_) => HMAC_LEN,
            _ => CRC_LEN,
        };
        if frame.len() < HEADER_LEN_55AA + trailer_len + SUFFIX_LEN {
            return Err(Error::Frame(format!("frame too short ({} bytes)", frame.len())));
        }
        if be_u32(&frame[0..4]) != PREFIX_55AA {
            return Err(Error::Frame("bad 55AA prefix".into()));
        }
        let seq = be_u32(&frame[4..8]);
        let cmd = be_u32(&frame[8..12]);
        let len = be_u32(&frame[12..16]) as usize;
        if HEADER_LEN_55AA + len != frame.len() {
            return Err(Error::Frame(format!(
                "length field {len} does not match frame of {} bytes",
                frame.len()
            )));
        }
        if be_u32(&frame[frame.len() - SUFFIX_LEN..]) != SUFFIX_55AA {
            return Err(Error::Frame("bad 55AA suffix".into()));
        }
        let body_end = frame.len() - SUFFIX_LEN - trailer_len;
        let trailer = &frame[body_end..frame.len() - SUFFIX_LEN];
        match self {
            Codec::Hmac(key) => {
                if !crypto::verify_hmac(key, &frame[..body_end], trailer) {
                    return Err(Error::Frame("HMAC mismatch".into()));
                }
            }
            _ => {
                if crypto::crc32(&frame[..body_end]) != be_u32(trailer) {
                    return Err(Error::Frame("CRC mismatch".into()));
                }
            }
        }
        Ok((seq, cmd, frame[HEADER_LEN_55AA..body_end].to_vec()))
    }
}

fn encode_6699(key: &Key, iv: &[u8; GCM_IV_LEN], seq: u32, cmd: u32, payload: &[u8]) -> Result<Vec<u8>> {
    let len = GCM_IV_LEN + payload.len() + GCM_TAG_LEN;
    let mut out = Vec::with_capacity(HEADER_LEN_6699 + len + SUFFIX_LEN);
    out.extend_from_slice(&PREFIX_6699.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&seq.to_be_bytes());
    out.extend_from_slice(&cmd.to_be_bytes());
    out.extend_from_slice(&(len as u32).to_be_bytes());
    let sealed = crypto::gcm_encrypt(key, iv, &out[4..HEADER_LEN_6699], payload)?;
    out.extend_from_slice(iv);
    out.extend_from_slice(&sealed);
    out.extend_from_slice(&SUFFIX_6699.to_be_bytes());
    Ok(out)
}

fn decode_6699(key: &Key, frame: &[u8]) -> Result<(u32, u32, Vec<u8>)> {
    if frame.len() < HEADER_LEN_6699 + GCM_IV_LEN + GCM_TAG_LEN + SUFFIX_LEN {
        return Err(Error::Frame(format!("frame too short ({} bytes)", frame.len())));
    }
    if be_u32(&frame[0..4]) != PREFIX_6699 {
        return Err(Error::Frame("bad 6699 prefix".into()));
    }
    let seq = be_u32(&frame[6..10]);
    let cmd = be_u32(&frame[10..14]);
    let len = be_u32(&frame[14..18]) as usize;
    if HEADER_LEN_6699 + len + SUFFIX_LEN != frame.len() {
        return Err(Error::Frame(format!(
            "length field {len} does not match frame of {} bytes",
            frame.len()
        )));
    }
    if be_u32(&frame[frame.len() - SUFFIX_LEN..]) != SUFFIX_6699 {
        return Err(Error::Frame("bad 6699 suffix".into()));
    }
    let iv = &frame[HEADER_LEN_6699..HEADER_LEN_6699 + GCM_IV_LEN];
    let sealed = &frame[HEADER_LEN_6699 + GCM_IV_LEN..frame.len() - SUFFIX_LEN];
    let plain = crypto::gcm_decrypt(key, iv, &frame[4..HEADER_LEN_6699], sealed)?;
    Ok((seq, cmd, plain))
}

/// Return codes are small integers, so a payload starting with three zero
/// bytes is taken to carry one.
fn split_retcode(payload: Vec<u8>) -> (Option<u32>, Vec<u8>) {
    if payload.len() >= RETCODE_LEN && payload[..3] == [0, 0, 0] {
        (Some(be_u32(&payload[..RETCODE_LEN])), payload[RETCODE_LEN..].to_vec())
    } else {
        (None, payload)
    }
}

fn be_u32(b: &[u8]) -> u32 {
    u32::from_be_bytes([b[0], b[1], b[2], b[3]])
}

/// Read one complete frame (header through suffix) from a stream.
pub(crate) async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>> {
    let mut frame = vec![0u8; 4];
    reader.read_exact(&mut frame).await?;
    // The 6699 length field leaves out the suffix.
    let (header_len, extra) = match be_u32(&frame) {
        PREFIX_55AA => (HEADER_LEN_55AA, 0),
        PREFIX_6699 => (HEADER_LEN_6699, SUFFIX_LEN),
        other => return Err(Error::Frame(format!("unknown prefix 0x{other:08X}"))),
    };
    frame.resize(header_len, 0);
    reader.read_exact(&mut frame[4..]).await?;
    let len = be_u32(&frame[header_len - 4..]) as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::Frame(format!("frame length {len} exceeds limit")));
    }
    frame.resize(header_len + len + extra, 0);
    reader.read_exact(&mut frame[header_len..]).await?;
    Ok(frame)
}
