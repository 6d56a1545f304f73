//! Registry adapter: the service node list as the quorum source.

use crate::ports::QuorumStateSource;
use shared_types::PublicKey;
use sn_01_service_node_list::{
    BlockchainReader, CryptoProvider, QuorumState, ServiceNodeList, ServiceNodeListApi,
    ServiceNodeStore,
};

impl<B, C, S> QuorumStateSource for ServiceNodeList<B, C, S>
where
    B: BlockchainReader,
    C: CryptoProvider,
    S: ServiceNodeStore,
{
    fn quorum_state(&self, height: u64) -> Option<QuorumState> {
        ServiceNodeListApi::quorum_state(self, height)
    }

    fn is_service_node(&self, pubkey: &PublicKey) -> bool {
        ServiceNodeListApi::is_service_node(self, pubkey)
    }
}
