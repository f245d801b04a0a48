//! Generic netlink transport to the vrouter kernel module
//!
//! Every request travels as one generic netlink message of the `vrouter`
//! family. Attribute 1 of that message carries the encoded [`Frame`]; the
//! module answers the same way, possibly over several netlink messages,
//! and the exchange ends once a frame with a response object arrives.
//!
//! [`Frame`]: crate::codec::Frame

#[cfg(target_os = "linux")]
mod linux {
    use crate::codec::{Frame, RouteMessage};
    use crate::config::TransportConfig;
    use crate::error::TransportError;
    use crate::transport::{ResponseBatch, Transport};
    use netlink_packet_core::{
        NetlinkHeader, NetlinkMessage, NetlinkPayload, NetlinkSerializable, NLM_F_REQUEST,
    };
    use netlink_packet_generic::ctrl::nlas::GenlCtrlAttrs;
    use netlink_packet_generic::ctrl::{GenlCtrl, GenlCtrlCmd};
    use netlink_packet_generic::{GenlFamily, GenlHeader, GenlMessage};
    use netlink_packet_utils::nla::{DefaultNla, NlasIterator};
    use netlink_packet_utils::{DecodeError, Emitable, ParseableParametrized};
    use netlink_sys::{protocols::NETLINK_GENERIC, Socket, SocketAddr};
    use std::fmt::Debug;
    use std::os::fd::AsRawFd;
    use tracing::{debug, instrument, trace, warn};

    /// Generic netlink command of every vrouter request.
    const SANDESH_REQUEST: u8 = 1;

    /// Attribute carrying the encoded frame.
    const NL_ATTR_VR_MESSAGE_PROTOCOL: u16 = 1;

    const NLMSG_ALIGNTO: usize = 4;

    /// Payload of a vrouter generic netlink message: one encoded frame.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct VrouterPayload {
        frame: Vec<u8>,
    }

    impl VrouterPayload {
        pub fn new(frame: Vec<u8>) -> Self {
            Self { frame }
        }

        pub fn frame(&self) -> &[u8] {
            &self.frame
        }

        fn attribute(&self) -> DefaultNla {
            DefaultNla::new(NL_ATTR_VR_MESSAGE_PROTOCOL, self.frame.clone())
        }
    }

    impl GenlFamily for VrouterPayload {
        fn family_name() -> &'static str {
            "vrouter"
        }

        fn command(&self) -> u8 {
            SANDESH_REQUEST
        }

        fn version(&self) -> u8 {
            0
        }
    }

    impl Emitable for VrouterPayload {
        fn buffer_len(&self) -> usize {
            self.attribute().buffer_len()
        }

        fn emit(&self, buffer: &mut [u8]) {
            self.attribute().emit(buffer)
        }
    }

    impl ParseableParametrized<[u8], GenlHeader> for VrouterPayload {
        fn parse_with_param(buf: &[u8], _header: GenlHeader) -> Result<Self, DecodeError> {
            for nla in NlasIterator::new(buf) {
                let nla = nla?;
                if nla.kind() == NL_ATTR_VR_MESSAGE_PROTOCOL {
                    return Ok(Self::new(nla.value().to_vec()));
                }
            }
            Err(DecodeError::from("vrouter message attribute missing"))
        }
    }

    /// Blocking generic netlink connection to the vrouter module.
    pub struct NetlinkTransport {
        socket: Socket,
        family_id: u16,
        sequence: u32,
        buffer_size: usize,
    }

    impl NetlinkTransport {
        /// Opens a generic netlink socket and resolves the vrouter family id.
        ///
        /// Requires the kernel module to be loaded; an unknown family name
        /// fails with [`TransportError::FamilyNotFound`].
        #[instrument(skip(config), fields(family = %config.family_name))]
        pub fn connect(config: &TransportConfig) -> Result<Self, TransportError> {
            let mut socket = Socket::new(NETLINK_GENERIC)
                .map_err(|e| TransportError::socket("socket", e))?;
            socket
                .bind_auto()
                .map_err(|e| TransportError::socket("bind", e))?;
            socket
                .connect(&SocketAddr::new(0, 0))
                .map_err(|e| TransportError::socket("connect", e))?;

            let mut transport = Self {
                socket,
                family_id: 0,
                sequence: 0,
                buffer_size: config.receive_buffer_size,
            };
            transport.tune_socket(config);
            transport.family_id = transport.resolve_family(&config.family_name)?;

            debug!(family_id = transport.family_id, "vrouter netlink family resolved");
            Ok(transport)
        }

        /// Applies the receive timeout and buffer size.
        fn tune_socket(&self, config: &TransportConfig) {
            let fd = self.socket.as_raw_fd();

            if let Some(timeout) = config.receive_timeout() {
                let tv = libc::timeval {
                    tv_sec: timeout.as_secs() as libc::time_t,
                    tv_usec: timeout.subsec_micros() as libc::suseconds_t,
                };
                let ret = unsafe {
                    libc::setsockopt(
                        fd,
                        libc::SOL_SOCKET,
                        libc::SO_RCVTIMEO,
                        &tv as *const _ as *const libc::c_void,
                        std::mem::size_of::<libc::timeval>() as libc::socklen_t,
                    )
                };
                if ret < 0 {
                    warn!("Failed to set SO_RCVTIMEO, receives may block indefinitely");
                } else {
                    debug!(timeout_ms = timeout.as_millis() as u64, "Set receive timeout");
                }
            }

            let size = libc::c_int::try_from(self.buffer_size).unwrap_or(libc::c_int::MAX);
            let ret = unsafe {
                libc::setsockopt(
                    fd,
                    libc::SOL_SOCKET,
                    libc::SO_RCVBUF,
                    &size as *const _ as *const libc::c_void,
                    std::mem::size_of::<libc::c_int>() as libc::socklen_t,
                )
            };
            if ret < 0 {
                warn!("Failed to set SO_RCVBUF, using default buffer size");
            }
        }

        fn next_sequence(&mut self) -> u32 {
            self.sequence = self.sequence.wrapping_add(1);
            self.sequence
        }

        fn send_message<P>(&mut self, payload: P) -> Result<(), TransportError>
        where
            P: NetlinkSerializable + Debug,
        {
            let mut header = NetlinkHeader::default();
            header.flags = NLM_F_REQUEST;
            header.sequence_number = self.next_sequence();

            let mut packet = NetlinkMessage::new(header, NetlinkPayload::InnerMessage(payload));
            packet.finalize();

            let mut buf = vec![0u8; packet.buffer_len()];
            packet.serialize(&mut buf[..]);

            self.socket
                .send(&buf, 0)
                .map_err(|e| TransportError::socket("send", e))?;
            trace!(bytes = buf.len(), seq = self.sequence, "Sent netlink message");
            Ok(())
        }

        fn receive_datagram(&mut self) -> Result<Vec<u8>, TransportError> {
            let mut buf = Vec::with_capacity(self.buffer_size);
            self.socket
                .recv(&mut buf, 0)
                .map_err(|e| TransportError::socket("recv", e))?;
            Ok(buf)
        }

        #[instrument(skip(self))]
        fn resolve_family(&mut self, name: &str) -> Result<u16, TransportError> {
            let request = GenlMessage::from_payload(GenlCtrl {
                cmd: GenlCtrlCmd::GetFamily,
                nlas: vec![GenlCtrlAttrs::FamilyName(name.to_owned())],
            });
            self.send_message(request)?;

            let buf = self.receive_datagram()?;
            for message in split_messages::<GenlMessage<GenlCtrl>>(&buf)? {
                match message.payload {
                    NetlinkPayload::InnerMessage(genl) => {
                        let id = genl.payload.nlas.iter().find_map(|nla| match nla {
                            GenlCtrlAttrs::FamilyId(id) => Some(*id),
                            _ => None,
                        });
                        if let Some(id) = id {
                            return Ok(id);
                        }
                    }
                    NetlinkPayload::Error(err) if err.code.is_some() => {
                        debug!(?err, "Family lookup rejected");
                        return Err(TransportError::FamilyNotFound(name.to_owned()));
                    }
                    _ => {}
                }
            }
            Err(TransportError::FamilyNotFound(name.to_owned()))
        }
    }

    impl Transport for NetlinkTransport {
        #[instrument(skip(self, request), fields(op = %request.operation, vrf = request.vrf_id))]
        fn send(&mut self, request: &RouteMessage) -> Result<(), TransportError> {
            let payload = VrouterPayload::new(Frame::request(request).encode());
            let mut message = GenlMessage::from_payload(payload);
            message.set_resolved_family_id(self.family_id);
            self.send_message(message)
        }

        #[instrument(skip(self))]
        fn receive(&mut self) -> Result<ResponseBatch, TransportError> {
            let mut frame = Frame::default();

            loop {
                let buf = self.receive_datagram()?;
                for message in split_messages::<GenlMessage<VrouterPayload>>(&buf)? {
                    match message.payload {
                        NetlinkPayload::InnerMessage(genl) => {
                            let part = Frame::decode(genl.payload.frame())
                                .map_err(|e| TransportError::Envelope(e.to_string()))?;
                            frame.records.extend(part.records);
                            if part.status.is_some() {
                                frame.status = part.status;
                            }
                        }
                        NetlinkPayload::Error(err) => {
                            if let Some(code) = err.code {
                                return Err(TransportError::Rejected {
                                    errno: -code.get(),
                                });
                            }
                        }
                        NetlinkPayload::Done(_) => {
                            if frame.status.is_none() {
                                return Err(TransportError::MissingStatus);
                            }
                        }
                        _ => {}
                    }
                }

                if frame.status.is_some() {
                    trace!(records = frame.records.len(), "Received response");
                    return ResponseBatch::from_frame(frame);
                }
            }
        }
    }

    /// Splits one datagram into its netlink messages.
    fn split_messages<I>(buf: &[u8]) -> Result<Vec<NetlinkMessage<I>>, TransportError>
    where
        I: netlink_packet_core::NetlinkDeserializable + Debug,
    {
        let mut messages = Vec::new();
        let mut offset = 0;

        while offset < buf.len() {
            let message = NetlinkMessage::<I>::deserialize(&buf[offset..])
                .map_err(|e| TransportError::Envelope(e.to_string()))?;
            let len = message.header.length as usize;
            if len == 0 {
                break;
            }
            offset += (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1);
            messages.push(message);
        }

        Ok(messages)
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::codec::Operation;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_payload_attribute_layout() {
            let frame = Frame::request(&RouteMessage::new(Operation::Dump, 2)).encode();
            let payload = VrouterPayload::new(frame.clone());

            let mut buf = vec![0u8; payload.buffer_len()];
            payload.emit(&mut buf);
            // nla header: length then kind, host order
            assert_eq!(
                u16::from_ne_bytes([buf[0], buf[1]]) as usize,
                4 + frame.len()
            );
            assert_eq!(u16::from_ne_bytes([buf[2], buf[3]]), NL_ATTR_VR_MESSAGE_PROTOCOL);

            let header = GenlHeader {
                cmd: SANDESH_REQUEST,
                version: 0,
            };
            let parsed = VrouterPayload::parse_with_param(&buf, header).unwrap();
            assert_eq!(parsed.frame(), &frame[..]);
        }

        #[test]
        fn test_payload_without_attribute() {
            let header = GenlHeader {
                cmd: SANDESH_REQUEST,
                version: 0,
            };
            assert!(VrouterPayload::parse_with_param(&[], header).is_err());
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::*;

/// Stand-in for platforms without netlink
#[cfg(not(target_os = "linux"))]
mod unsupported {
    use crate::codec::RouteMessage;
    use crate::config::TransportConfig;
    use crate::error::TransportError;
    use crate::transport::{ResponseBatch, Transport};

    pub struct NetlinkTransport;

    impl NetlinkTransport {
        pub fn connect(_config: &TransportConfig) -> Result<Self, TransportError> {
            Err(TransportError::Unsupported)
        }
    }

    impl Transport for NetlinkTransport {
        fn send(&mut self, _request: &RouteMessage) -> Result<(), TransportError> {
            Err(TransportError::Unsupported)
        }

        fn receive(&mut self) -> Result<ResponseBatch, TransportError> {
            Err(TransportError::Unsupported)
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub use unsupported::*;
