use crate::config::SharedConfig;
use crate::error::Error;
use crate::store::DynRecordStore;
use std::net::Ipv4Addr;
use std::str::FromStr;
use trust_dns_client::rr::rdata::{SOA, TXT};
use trust_dns_client::rr::{LowerName, Name, RData, Record, RecordType};
use trust_dns_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};

/// TTL for every synthesized record. Challenge tokens are short-lived, so
/// nothing this server answers should be cached for long.
const ANSWER_TTL: u32 = 5;

/// Answers questions out of the server identity and the record store.
///
/// Synthesis is pure apart from the store read on the TXT path: each
/// question maps to zero or one record, decided per query type.
#[derive(Clone)]
pub struct Handler {
    config: SharedConfig,
    store: DynRecordStore,
}

impl Handler {
    pub(super) fn new(config: SharedConfig, store: DynRecordStore) -> Self {
        Handler { config, store }
    }

    /// Build the reply for one decoded message.
    ///
    /// Only the query opcode is handled; anything else gets an empty reply.
    /// Questions are answered in order. A name error sets the reply rcode
    /// and processing continues; any other synthesis error sets SERVFAIL and
    /// stops, keeping answers already appended. The rcode reflects the most
    /// recent outcome that wrote it: a later successful question does not
    /// clear an earlier NXDOMAIN.
    pub(crate) async fn reply_to(&self, req: &Message) -> Message {
        let mut reply = Message::new();
        reply
            .set_id(req.id())
            .set_message_type(MessageType::Response)
            .set_op_code(req.op_code())
            .set_recursion_desired(req.recursion_desired())
            .set_authoritative(true);
        for query in req.queries() {
            reply.add_query(query.clone());
        }
        if req.op_code() != OpCode::Query {
            return reply;
        }
        for query in req.queries() {
            match self.answer(query).await {
                Ok(Some(record)) => {
                    reply.add_answer(record);
                }
                Ok(None) => {}
                Err(Error::NameError(name)) => {
                    tracing::debug!("no {} record for \"{name}\"", query.query_type());
                    reply.set_response_code(ResponseCode::NXDomain);
                }
                Err(err) => {
                    tracing::warn!(
                        "failed to answer {} query for \"{}\": {err}",
                        query.query_type(),
                        query.name()
                    );
                    reply.set_response_code(ResponseCode::ServFail);
                    break;
                }
            }
        }
        reply
    }

    /// Synthesize at most one record for a single question.
    pub(crate) async fn answer(&self, query: &Query) -> Result<Option<Record>, Error> {
        let name = LowerName::from(query.name());
        tracing::debug!("handling {} query for \"{name}\"", query.query_type());
        match query.query_type() {
            // TXT records are the only record type that matters for ACME
            // dns-01 challenges.
            RecordType::TXT => self.answer_txt(&name).await,
            RecordType::CNAME => self.answer_cname(&name),
            RecordType::A => self.answer_a(&name),
            // NS and SOA serve authoritative lookups for any queried name,
            // straight from the configured identity.
            RecordType::NS => Ok(Some(self.record(
                &name,
                RData::NS(Name::from(&self.config.nameserver)),
            ))),
            RecordType::SOA => Ok(Some(self.answer_soa())),
            unsupported => Err(Error::UnimplementedRecordType(unsupported)),
        }
    }

    async fn answer_txt(&self, name: &LowerName) -> Result<Option<Record>, Error> {
        let token = match self.store.get(&name.to_string()).await {
            Ok(token) => token,
            Err(Error::KeyNotFound(_)) => return Err(Error::NameError(name.clone())),
            Err(err) => return Err(err),
        };
        // Stored tokens are opaque bytes; hand them back untouched.
        let txt = TXT::from_bytes(vec![token.as_slice()]);
        Ok(Some(self.record(name, RData::TXT(txt))))
    }

    fn answer_cname(&self, name: &LowerName) -> Result<Option<Record>, Error> {
        // Only the authoritative domain itself ever has a CNAME answer.
        if *name != self.config.domain {
            return Err(Error::NameError(name.clone()));
        }
        if !self.config.public_is_cname() {
            // Literal public IP: nothing to advertise, and no error either.
            return Ok(None);
        }
        let target = Name::from_str(&self.config.public_value())?;
        Ok(Some(self.record(name, RData::CNAME(target))))
    }

    fn answer_a(&self, name: &LowerName) -> Result<Option<Record>, Error> {
        // Loopback for every name, except the authoritative domain when the
        // public identity is a literal IP.
        let mut addr = Ipv4Addr::LOCALHOST;
        if *name == self.config.domain
            && !self.config.public_is_cname()
            && !self.config.public_addr.is_empty()
        {
            addr = self
                .config
                .public_addr
                .parse()
                .map_err(|_| Error::InvalidAddress(self.config.public_addr.clone()))?;
        }
        Ok(Some(self.record(name, RData::A(addr))))
    }

    fn answer_soa(&self) -> Record {
        // All numeric SOA fields are deliberately zero: this server is not a
        // zone-transfer-capable primary and the values carry no meaning.
        let soa = SOA::new(
            Name::from(&self.config.nameserver),
            Name::from(&self.config.rname),
            0,
            0,
            0,
            0,
            0,
        );
        self.record(&self.config.nameserver, RData::SOA(soa))
    }

    fn record(&self, name: &LowerName, rdata: RData) -> Record {
        Record::from_rdata(Name::from(name), ANSWER_TTL, rdata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RawConfig};
    use crate::store::{InMemoryStore, RecordStore};
    use std::sync::Arc;

    fn handler(public_addr: &str) -> Handler {
        let config = Config::assemble(RawConfig {
            domain: Some("acme.com".to_string()),
            public_addr: (!public_addr.is_empty()).then(|| public_addr.to_string()),
            ..RawConfig::default()
        })
        .unwrap();
        Handler::new(Arc::new(config), Arc::new(InMemoryStore::default()))
    }

    fn request(questions: &[(&str, RecordType)]) -> Message {
        let mut msg = Message::new();
        msg.set_id(42)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query);
        for (name, qtype) in questions {
            msg.add_query(Query::query(Name::from_str(name).unwrap(), *qtype));
        }
        msg
    }

    fn txt_bytes(record: &Record) -> Vec<u8> {
        match record.data() {
            Some(RData::TXT(txt)) => txt
                .txt_data()
                .iter()
                .flat_map(|chunk| chunk.iter().copied())
                .collect(),
            other => panic!("expected TXT rdata, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn txt_query_returns_presented_token() {
        let handler = handler("127.0.0.1");
        handler
            .store
            .set("_acme-challenge.acme.com.", b"tok123")
            .await
            .unwrap();

        let reply = handler
            .reply_to(&request(&[("_acme-challenge.acme.com.", RecordType::TXT)]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert_eq!(reply.answers().len(), 1);
        assert_eq!(txt_bytes(&reply.answers()[0]), b"tok123");
        assert_eq!(reply.answers()[0].ttl(), 5);
    }

    #[tokio::test]
    async fn txt_query_is_case_insensitive() {
        let handler = handler("127.0.0.1");
        handler
            .store
            .set("_acme-challenge.acme.com.", b"tok123")
            .await
            .unwrap();

        let reply = handler
            .reply_to(&request(&[("_ACME-Challenge.ACME.com.", RecordType::TXT)]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert_eq!(txt_bytes(&reply.answers()[0]), b"tok123");
    }

    #[tokio::test]
    async fn txt_answer_preserves_raw_token_bytes() {
        let handler = handler("127.0.0.1");
        let raw = [0xff, 0xfe, b'x'];
        handler
            .store
            .set("_acme-challenge.acme.com.", &raw)
            .await
            .unwrap();

        let reply = handler
            .reply_to(&request(&[("_acme-challenge.acme.com.", RecordType::TXT)]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert_eq!(txt_bytes(&reply.answers()[0]), raw);
    }

    #[tokio::test]
    async fn txt_miss_is_nxdomain() {
        let handler = handler("127.0.0.1");
        let reply = handler
            .reply_to(&request(&[("_acme-challenge.acme.com.", RecordType::TXT)]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::NXDomain);
        assert!(reply.answers().is_empty());
    }

    #[tokio::test]
    async fn a_query_returns_public_ip_for_the_domain() {
        let handler = handler("203.0.113.7");
        let reply = handler.reply_to(&request(&[("acme.com.", RecordType::A)])).await;
        assert_eq!(
            reply.answers()[0].data(),
            Some(&RData::A(Ipv4Addr::new(203, 0, 113, 7)))
        );
    }

    #[tokio::test]
    async fn a_query_returns_loopback_for_other_names() {
        let handler = handler("203.0.113.7");
        let reply = handler
            .reply_to(&request(&[("other.acme.com.", RecordType::A)]))
            .await;
        assert_eq!(
            reply.answers()[0].data(),
            Some(&RData::A(Ipv4Addr::LOCALHOST))
        );
    }

    #[tokio::test]
    async fn cname_public_suppresses_the_a_override() {
        let handler = handler("edge.example.net");
        let reply = handler.reply_to(&request(&[("acme.com.", RecordType::A)])).await;
        assert_eq!(
            reply.answers()[0].data(),
            Some(&RData::A(Ipv4Addr::LOCALHOST))
        );

        let reply = handler
            .reply_to(&request(&[("acme.com.", RecordType::CNAME)]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert_eq!(
            reply.answers()[0].data(),
            Some(&RData::CNAME(Name::from_str("edge.example.net").unwrap()))
        );
    }

    #[tokio::test]
    async fn cname_query_with_literal_ip_has_no_answer() {
        let handler = handler("127.0.0.1");
        let reply = handler
            .reply_to(&request(&[("acme.com.", RecordType::CNAME)]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert!(reply.answers().is_empty());
    }

    #[tokio::test]
    async fn cname_query_for_other_name_is_nxdomain() {
        let handler = handler("edge.example.net");
        let reply = handler
            .reply_to(&request(&[("other.acme.com.", RecordType::CNAME)]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::NXDomain);
        assert!(reply.answers().is_empty());
    }

    #[tokio::test]
    async fn ns_and_soa_answer_any_name() {
        let handler = handler("127.0.0.1");

        let reply = handler
            .reply_to(&request(&[("unrelated.org.", RecordType::NS)]))
            .await;
        assert_eq!(
            reply.answers()[0].data(),
            Some(&RData::NS(Name::from_str("acme.com.").unwrap()))
        );

        let reply = handler
            .reply_to(&request(&[("unrelated.org.", RecordType::SOA)]))
            .await;
        match reply.answers()[0].data() {
            Some(RData::SOA(soa)) => {
                assert_eq!(soa.mname(), &Name::from_str("acme.com.").unwrap());
                assert_eq!(
                    soa.rname(),
                    &Name::from_str("hostmaster.acme.com.").unwrap()
                );
                assert_eq!(soa.serial(), 0);
                assert_eq!(soa.refresh(), 0);
                assert_eq!(soa.retry(), 0);
                assert_eq!(soa.expire(), 0);
                assert_eq!(soa.minimum(), 0);
            }
            other => panic!("expected SOA rdata, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_type_is_servfail() {
        let handler = handler("127.0.0.1");
        let reply = handler.reply_to(&request(&[("acme.com.", RecordType::MX)])).await;
        assert_eq!(reply.response_code(), ResponseCode::ServFail);
        assert!(reply.answers().is_empty());
    }

    #[tokio::test]
    async fn multi_question_rcode_is_last_write_wins() {
        let handler = handler("127.0.0.1");
        handler
            .store
            .set("_acme-challenge.acme.com.", b"tok123")
            .await
            .unwrap();

        // A name error on the first question is not cleared by the second
        // question succeeding, but the second answer is still included.
        let reply = handler
            .reply_to(&request(&[
                ("missing.acme.com.", RecordType::TXT),
                ("_acme-challenge.acme.com.", RecordType::TXT),
            ]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::NXDomain);
        assert_eq!(reply.answers().len(), 1);
    }

    #[tokio::test]
    async fn hard_error_stops_processing_but_keeps_answers() {
        let handler = handler("127.0.0.1");
        handler
            .store
            .set("_acme-challenge.acme.com.", b"tok123")
            .await
            .unwrap();

        let reply = handler
            .reply_to(&request(&[
                ("_acme-challenge.acme.com.", RecordType::TXT),
                ("acme.com.", RecordType::MX),
                ("acme.com.", RecordType::A),
            ]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::ServFail);
        assert_eq!(reply.answers().len(), 1);
    }

    /// A store whose reads always fail, as if the backend went away.
    struct FailingStore;

    #[async_trait::async_trait]
    impl RecordStore for FailingStore {
        async fn get(&self, _key: &str) -> Result<Vec<u8>, Error> {
            Err(Error::Store(sqlx::Error::PoolClosed))
        }

        async fn set(&self, _key: &str, _value: &[u8]) -> Result<(), Error> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<(), Error> {
            Ok(())
        }

        async fn close(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn store_failure_on_the_read_path_is_servfail() {
        let config = Config::assemble(RawConfig {
            domain: Some("acme.com".to_string()),
            public_addr: Some("127.0.0.1".to_string()),
            ..RawConfig::default()
        })
        .unwrap();
        let handler = Handler::new(Arc::new(config), Arc::new(FailingStore));

        // The backend error surfaces as SERVFAIL and the remaining question
        // is not processed.
        let reply = handler
            .reply_to(&request(&[
                ("_acme-challenge.acme.com.", RecordType::TXT),
                ("acme.com.", RecordType::A),
            ]))
            .await;
        assert_eq!(reply.response_code(), ResponseCode::ServFail);
        assert!(reply.answers().is_empty());
    }

    #[tokio::test]
    async fn non_query_opcode_gets_empty_reply() {
        let handler = handler("127.0.0.1");
        let mut req = request(&[("acme.com.", RecordType::A)]);
        req.set_op_code(OpCode::Status);
        let reply = handler.reply_to(&req).await;
        assert_eq!(reply.response_code(), ResponseCode::NoError);
        assert!(reply.answers().is_empty());
    }
}
