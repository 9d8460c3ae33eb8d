use ethereum_types::U256;
use serde::{Deserialize, Serialize};

/// Groth16 proof points as consumed by the on-chain verifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    pub a: [U256; 2],
    pub b: [[U256; 2]; 2],
    pub c: [U256; 2],
}
