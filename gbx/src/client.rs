use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use byteorder::{ByteOrder, LittleEndian};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{
    unbounded_channel, UnboundedReceiver as Receiver, UnboundedSender as Sender,
};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::adapter::callbacks::read_callback;
use crate::api::Callback;
use crate::xml::*;

/// The variants of this enum are used to control the task
/// that matches requests with responses, and forwards callbacks.
#[derive(Debug)]
enum Msg {
    /// An XML-RPC call has been made, and once the response is received,
    /// it needs to be sent back to the caller.
    AwaitResponse {
        handle: u32,
        eventual_response: oneshot::Sender<Response>,
    },

    /// We have received a callback.
    ///
    /// In this instance, the controller acts as an XML-RPC server,
    /// that receives a method call, but does not send a method response
    /// back. This is how we get notified of events on the game server.
    FulfillCallback { call: Call },

    /// We have received an XML-RPC method response that needs to be
    /// sent to the caller, matched by the handle of the call.
    FulfillResponse { handle: u32, response: Response },
}

/// If the bit-and of a handle and this value equal 0,
/// the received data is a callback. Otherwise, it is a method response.
const RESPONSE_MASK: u32 = 0x8000_0000;

const SERVER_PROTOCOL: &str = "GBXRemote 2";

/// Prefix an XML payload with its length and handle.
fn frame(handle: u32, payload: &[u8]) -> Vec<u8> {
    let mut header = [0; 8];
    LittleEndian::write_u32(&mut header[..4], payload.len() as u32);
    LittleEndian::write_u32(&mut header[4..], handle);
    [&header[..], payload].concat()
}

/// Read the payload length and handle from a message header.
fn read_header(header: &[u8; 8]) -> (usize, u32) {
    let length = LittleEndian::read_u32(&header[..4]) as usize;
    let handle = LittleEndian::read_u32(&header[4..]);
    (length, handle)
}

/// Open a TCP connection to the game server.
///
/// Will return an IO error if a connection could not be
/// established, which typically means there is no running server.
///
/// # Panics
/// Panics when encountering an unexpected server protocol.
async fn tcp_connect(addr: &str) -> std::io::Result<TcpStream> {
    let mut stream = TcpStream::connect(addr).await?;

    let mut length_bytes = [0; 4];
    stream.read_exact(&mut length_bytes).await?;
    let protocol_name_length = LittleEndian::read_u32(&length_bytes);

    let mut protocol_name_bytes = vec![0; protocol_name_length as usize];
    stream.read_exact(&mut protocol_name_bytes).await?;
    let protocol_name = String::from_utf8_lossy(&protocol_name_bytes);

    if protocol_name != SERVER_PROTOCOL {
        panic!(
            "server uses protocol '{}', expected '{}'",
            protocol_name, SERVER_PROTOCOL
        );
    }
    Ok(stream)
}

/// Spawns a task that reads from the TCP connection to the game server,
/// and sends out either `Msg::FulfillResponse` or `Msg::FulfillCallback`
/// messages.
///
/// # Panics
/// This task terminates with a panic
/// - when the TCP connection is interrupted
/// - when parsing failed
fn tcp_loop(tcp_stream: OwnedReadHalf, msg_out: Sender<Msg>) -> JoinHandle<()> {
    async fn try_loop(mut tcp_stream: OwnedReadHalf, msg_out: Sender<Msg>) -> anyhow::Result<()> {
        let mut header = [0; 8];
        loop {
            tcp_stream
                .read_exact(&mut header)
                .await
                .context("no TCP connection")?;
            let (length, handle) = read_header(&header);
            if length == 0 {
                continue;
            }

            let mut payload = vec![0; length];
            tcp_stream
                .read_exact(&mut payload)
                .await
                .context("no TCP connection")?;
            let message = std::str::from_utf8(&payload).context("tcp message was not UTF-8")?;

            let msg = if handle & RESPONSE_MASK == 0 {
                Msg::FulfillCallback {
                    call: read_method_call(message)
                        .with_context(|| format!("failed to parse method call {}", message))?,
                }
            } else {
                Msg::FulfillResponse {
                    handle,
                    response: read_method_response(message)
                        .with_context(|| format!("failed to parse method response {}", message))?,
                }
            };
            msg_out
                .send(msg)
                .map_err(|_| anyhow!("msg receiver dropped"))?;
        }
    }

    tokio::spawn(async move {
        if let Err(err) = try_loop(tcp_stream, msg_out).await {
            panic!("lost connection to the game server: {:#}", err); // let it crash
        }
    })
}

/// This task consumes all `Msg`s, and produces `Callback`s, as well as
/// responses to waiting callers of an `RpcClient`.
///
/// It terminates once every message sender was dropped.
fn msg_loop(mut msg_in: Receiver<Msg>, cb_out: Sender<Callback>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut waiting_calls: HashMap<u32, oneshot::Sender<Response>> = HashMap::new();

        while let Some(msg) = msg_in.recv().await {
            match msg {
                Msg::AwaitResponse {
                    handle,
                    eventual_response,
                } => {
                    waiting_calls.insert(handle, eventual_response);
                }
                Msg::FulfillResponse { handle, response } => {
                    match waiting_calls.remove(&handle) {
                        Some(caller) => {
                            let _ = caller.send(response);
                        }
                        None => log::warn!("no call with handle {:#x}", handle),
                    }
                }
                Msg::FulfillCallback { call } => {
                    if let Some(cb) = read_callback(&call) {
                        let _ = cb_out.send(cb);
                    }
                }
            }
        }
    })
}

/// An XML-RPC client to the game server.
#[derive(Clone)]
pub struct RpcClient {
    /// The write half of the TCP stream between this controller
    /// and the game server.
    tcp_stream: Arc<Mutex<OwnedWriteHalf>>,

    /// The handle of the previous call. It is increased
    /// for each method call, so that responses can be traced
    /// back to them.
    prev_call_handle: Arc<Mutex<u32>>,

    /// The `Sender` that feeds the message loop.
    msg_out: Sender<Msg>,
}

impl RpcClient {
    fn new(tcp_stream: OwnedWriteHalf, msg_out: Sender<Msg>) -> RpcClient {
        RpcClient {
            msg_out,
            tcp_stream: Arc::new(Mutex::new(tcp_stream)),
            prev_call_handle: Arc::new(Mutex::new(RESPONSE_MASK)),
        }
    }

    /// Make an XML-RPC call, and let the caller handle faults.
    ///
    /// # Panics
    /// - when getting a different return type than expected
    /// - when the TCP connection was closed
    pub(in crate) async fn call<T>(&self, call: Call) -> Result<T, Fault>
    where
        T: serde::de::DeserializeOwned,
    {
        let value = self.call_response(&call).await?;
        match from_value(&value) {
            Ok(t) => Ok(t),
            Err(err) => panic!("unexpected return value for {}: {}", call.name, err),
        }
    }

    /// Make an XML-RPC call, and do not expect a fault.
    ///
    /// # Panics
    /// - when encountering a fault after all
    /// - see also: `call` doc
    pub(in crate) async fn call_unwrap<T>(&self, call: Call) -> T
    where
        T: serde::de::DeserializeOwned,
    {
        match self.call(call.clone()).await {
            Ok(t) => t,
            Err(fault) => panic!("unexpected {} for call {}", fault, call.name),
        }
    }

    async fn call_response(&self, call: &Call) -> Response {
        let handle = self.next_handle().await;
        let (resp_out, resp_in) = oneshot::channel::<Response>();

        self.msg_out
            .send(Msg::AwaitResponse {
                handle,
                eventual_response: resp_out,
            })
            .unwrap_or_else(|_| panic!("msg receiver was dropped"));

        log::debug!("call {:#x}: {}", handle, call.name);

        let msg = frame(handle, &write_method_call(call));
        self.tcp_stream
            .lock()
            .await
            .write_all(&msg)
            .await
            .expect("no TCP connection");

        let response = resp_in.await.expect("response sender was dropped");
        if let Err(fault) = &response {
            log::debug!("call {:#x}: {}", handle, fault);
        }
        response
    }

    async fn next_handle(&self) -> u32 {
        let mut prev = self.prev_call_handle.lock().await;
        *prev = match prev.checked_add(1) {
            Some(next) if next != u32::MAX => next,
            _ => RESPONSE_MASK + 1,
        };
        *prev
    }
}

/// A connection to the game server consists of
/// - a cloneable client to make calls with
/// - a receiver to consume callbacks with
/// - handles for the tasks that run the client & receiver
pub struct RpcConnection {
    pub client: RpcClient,
    pub callbacks: Receiver<Callback>,
    pub tcp_handle: JoinHandle<()>,
    pub msg_handle: JoinHandle<()>,
}

impl RpcConnection {
    /// Try to connect to the game server.
    ///
    /// Returns `None` if there is no running server at the given address.
    pub async fn new(addr: &str) -> Option<RpcConnection> {
        log::debug!("using XML-RPC address: {}", addr);

        let tcp_stream = match tcp_connect(addr).await {
            Ok(stream) => stream,
            Err(err) => {
                log::debug!("cannot connect: {}", err);
                return None;
            }
        };
        let (read_half, write_half) = tcp_stream.into_split();
        let (msg_out, msg_in) = unbounded_channel();
        let (cb_out, cb_in) = unbounded_channel();

        Some(RpcConnection {
            client: RpcClient::new(write_half, msg_out.clone()),
            callbacks: cb_in,
            tcp_handle: tcp_loop(read_half, msg_out),
            msg_handle: msg_loop(msg_in, cb_out),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_header() {
        let framed = frame(0x8000_0001, b"<xml/>");
        assert_eq!(14, framed.len());

        let mut header = [0; 8];
        header.copy_from_slice(&framed[..8]);
        assert_eq!((6, 0x8000_0001), read_header(&header));
        assert_eq!(b"<xml/>", &framed[8..]);
    }

    #[test]
    fn callback_handles() {
        let mut header = [0; 8];
        header.copy_from_slice(&frame(0x0000_0042, b"")[..8]);
        let (length, handle) = read_header(&header);
        assert_eq!(0, length);
        assert_eq!(0, handle & RESPONSE_MASK);
    }
}
