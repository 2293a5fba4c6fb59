//! Feature fragment registry
//!
//! Each optional feature contributes a fixed block of Solidity to a base
//! template. Fragments are pure data keyed by `(Feature, ContractFamily)`;
//! a feature that is not declared for a family has no fragment there.
//!
//! Callers skip missing fragments instead of failing, so interpreter
//! heuristics that over-suggest features never break generation.

use synth_core::{ContractFamily, Feature};

/// Code contribution of one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFragment {
    /// Import statements, one per line
    pub imports: &'static [&'static str],
    /// Base contracts appended to the inheritance list
    pub inheritance: &'static [&'static str],
    pub state_variables: &'static [&'static str],
    /// Base-constructor calls chained after the template's own
    pub constructor_calls: &'static [&'static str],
    pub constructor_body: &'static [&'static str],
    /// Complete member function definitions
    pub functions: &'static [&'static str],
}

impl FeatureFragment {
    const EMPTY: FeatureFragment = FeatureFragment {
        imports: &[],
        inheritance: &[],
        state_variables: &[],
        constructor_calls: &[],
        constructor_body: &[],
        functions: &[],
    };
}

const PAUSE_FUNCTIONS: [&str; 2] = [
    "function pause() public onlyOwner {
        _pause();
    }",
    "function unpause() public onlyOwner {
        _unpause();
    }",
];

const PAUSABLE_IMPORT: &str = "import \"@openzeppelin/contracts/utils/Pausable.sol\";";

static ERC20_MINTABLE: FeatureFragment = FeatureFragment {
    functions: &["function mint(address to, uint256 amount) public onlyOwner {
        _mint(to, amount);
    }"],
    ..FeatureFragment::EMPTY
};

static ERC20_BURNABLE: FeatureFragment = FeatureFragment {
    imports: &["import \"@openzeppelin/contracts/token/ERC20/extensions/ERC20Burnable.sol\";"],
    inheritance: &["ERC20Burnable"],
    ..FeatureFragment::EMPTY
};

static ERC20_PAUSABLE: FeatureFragment = FeatureFragment {
    imports: &[PAUSABLE_IMPORT],
    inheritance: &["Pausable"],
    functions: &[
        PAUSE_FUNCTIONS[0],
        PAUSE_FUNCTIONS[1],
        "function _update(address from, address to, uint256 value) internal override whenNotPaused {
        super._update(from, to, value);
    }",
    ],
    ..FeatureFragment::EMPTY
};

static ERC20_CAPPED: FeatureFragment = FeatureFragment {
    imports: &["import \"@openzeppelin/contracts/token/ERC20/extensions/ERC20Capped.sol\";"],
    inheritance: &["ERC20Capped"],
    state_variables: &["uint256 public constant CAP_MULTIPLIER = 10;"],
    constructor_calls: &["ERC20Capped(initialSupply * CAP_MULTIPLIER * 1e18)"],
    ..FeatureFragment::EMPTY
};

static ERC20_PERMIT: FeatureFragment = FeatureFragment {
    imports: &["import \"@openzeppelin/contracts/token/ERC20/extensions/ERC20Permit.sol\";"],
    inheritance: &["ERC20Permit"],
    constructor_calls: &["ERC20Permit(name)"],
    ..FeatureFragment::EMPTY
};

static ERC721_ENUMERABLE: FeatureFragment = FeatureFragment {
    imports: &["import \"@openzeppelin/contracts/token/ERC721/extensions/ERC721Enumerable.sol\";"],
    inheritance: &["ERC721Enumerable"],
    functions: &[
        "function _update(address to, uint256 tokenId, address auth)
        internal
        override(ERC721, ERC721Enumerable)
        returns (address)
    {
        return super._update(to, tokenId, auth);
    }",
        "function _increaseBalance(address account, uint128 value)
        internal
        override(ERC721, ERC721Enumerable)
    {
        super._increaseBalance(account, value);
    }",
        "function supportsInterface(bytes4 interfaceId)
        public
        view
        override(ERC721, ERC721Enumerable)
        returns (bool)
    {
        return super.supportsInterface(interfaceId);
    }",
    ],
    ..FeatureFragment::EMPTY
};

static ERC721_URI_STORAGE: FeatureFragment = FeatureFragment {
    imports: &["import \"@openzeppelin/contracts/token/ERC721/extensions/ERC721URIStorage.sol\";"],
    inheritance: &["ERC721URIStorage"],
    functions: &[
        "function setTokenURI(uint256 tokenId, string memory uri) public onlyOwner {
        _setTokenURI(tokenId, uri);
    }",
        "function tokenURI(uint256 tokenId)
        public
        view
        override(ERC721, ERC721URIStorage)
        returns (string memory)
    {
        return super.tokenURI(tokenId);
    }",
        "function supportsInterface(bytes4 interfaceId)
        public
        view
        override(ERC721, ERC721URIStorage)
        returns (bool)
    {
        return super.supportsInterface(interfaceId);
    }",
    ],
    ..FeatureFragment::EMPTY
};

static ERC721_BURNABLE: FeatureFragment = FeatureFragment {
    imports: &["import \"@openzeppelin/contracts/token/ERC721/extensions/ERC721Burnable.sol\";"],
    inheritance: &["ERC721Burnable"],
    ..FeatureFragment::EMPTY
};

static ERC721_PAUSABLE: FeatureFragment = FeatureFragment {
    imports: &[PAUSABLE_IMPORT],
    inheritance: &["Pausable"],
    functions: &[
        PAUSE_FUNCTIONS[0],
        PAUSE_FUNCTIONS[1],
        "function _update(address to, uint256 tokenId, address auth)
        internal
        override
        whenNotPaused
        returns (address)
    {
        return super._update(to, tokenId, auth);
    }",
    ],
    ..FeatureFragment::EMPTY
};

static ERC721_ROYALTY: FeatureFragment = FeatureFragment {
    imports: &["import \"@openzeppelin/contracts/token/common/ERC2981.sol\";"],
    inheritance: &["ERC2981"],
    constructor_body: &["_setDefaultRoyalty(owner, 250); // 2.5% royalty"],
    functions: &[
        "function setDefaultRoyalty(address receiver, uint96 feeNumerator) public onlyOwner {
        _setDefaultRoyalty(receiver, feeNumerator);
    }",
        "function supportsInterface(bytes4 interfaceId)
        public
        view
        override(ERC721, ERC2981)
        returns (bool)
    {
        return super.supportsInterface(interfaceId);
    }",
    ],
    ..FeatureFragment::EMPTY
};

static ERC1155_BURNABLE: FeatureFragment = FeatureFragment {
    imports: &["import \"@openzeppelin/contracts/token/ERC1155/extensions/ERC1155Burnable.sol\";"],
    inheritance: &["ERC1155Burnable"],
    ..FeatureFragment::EMPTY
};

static ERC1155_PAUSABLE: FeatureFragment = FeatureFragment {
    imports: &[PAUSABLE_IMPORT],
    inheritance: &["Pausable"],
    functions: &[
        PAUSE_FUNCTIONS[0],
        PAUSE_FUNCTIONS[1],
        "function _update(address from, address to, uint256[] memory ids, uint256[] memory values)
        internal
        override
        whenNotPaused
    {
        super._update(from, to, ids, values);
    }",
    ],
    ..FeatureFragment::EMPTY
};

static ERC1155_SUPPLY: FeatureFragment = FeatureFragment {
    imports: &["import \"@openzeppelin/contracts/token/ERC1155/extensions/ERC1155Supply.sol\";"],
    inheritance: &["ERC1155Supply"],
    functions: &["function _update(address from, address to, uint256[] memory ids, uint256[] memory values)
        internal
        override(ERC1155, ERC1155Supply)
    {
        super._update(from, to, ids, values);
    }"],
    ..FeatureFragment::EMPTY
};

/// Fragment `feature` contributes to `family`, if the family declares it
pub fn fragment(feature: Feature, family: ContractFamily) -> Option<&'static FeatureFragment> {
    use ContractFamily::*;
    use Feature::*;

    match (family, feature) {
        (FungibleToken, Mintable) => Some(&ERC20_MINTABLE),
        (FungibleToken, Burnable) => Some(&ERC20_BURNABLE),
        (FungibleToken, Pausable) => Some(&ERC20_PAUSABLE),
        (FungibleToken, Capped) => Some(&ERC20_CAPPED),
        (FungibleToken, Permit) => Some(&ERC20_PERMIT),
        (NonFungibleToken, Enumerable) => Some(&ERC721_ENUMERABLE),
        (NonFungibleToken, UriStorage) => Some(&ERC721_URI_STORAGE),
        (NonFungibleToken, Burnable) => Some(&ERC721_BURNABLE),
        (NonFungibleToken, Pausable) => Some(&ERC721_PAUSABLE),
        (NonFungibleToken, Royalty) => Some(&ERC721_ROYALTY),
        (MultiToken, Burnable) => Some(&ERC1155_BURNABLE),
        (MultiToken, Pausable) => Some(&ERC1155_PAUSABLE),
        (MultiToken, Supply) => Some(&ERC1155_SUPPLY),
        _ => None,
    }
}

/// Fragment for a raw feature id; unknown ids and undeclared features yield `None`
pub fn fragment_for_id(id: &str, family: ContractFamily) -> Option<&'static FeatureFragment> {
    Feature::parse(id).and_then(|feature| fragment(feature, family))
}
