use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cat {
    pub name: String,
    pub age: i64,
}

/// Body of `POST /cats`. Both fields are required and typed.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CreateCatDto {
    pub name: String,
    pub age: i64,
}

impl From<CreateCatDto> for Cat {
    fn from(dto: CreateCatDto) -> Self {
        Self { name: dto.name, age: dto.age }
    }
}
